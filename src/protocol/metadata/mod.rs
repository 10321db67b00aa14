//! Describe the brokers, topics, and partition leaders of a cluster.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use nombytes::NomBytes;

    use super::*;
    use crate::error::KafkaCode;

    #[test]
    fn encode() {
        let b = [0, 0, 0, 1, 0, 9, 112, 117, 114, 99, 104, 97, 115, 101, 115];
        let topics = vec!["purchases"];

        let req = request::MetadataRequest::new(&topics);
        let kafka_request = req.into_request().unwrap();

        assert_eq!(kafka_request.body, Bytes::copy_from_slice(&b));
    }

    #[test]
    fn parse() {
        let b = b"\0\0\0\x01\0\0\0\x07\0\x02k7\0\0#\x84\
            \0\0\0\x01\0\0\0\x01t\0\0\0\x01\0\0\0\0\0\0\0\0\0\x07\
            \0\0\0\x01\0\0\0\x07\0\0\0\x01\0\0\0\x07";

        let res = response::MetadataResponse {
            brokers: vec![response::Broker {
                node_id: 7,
                host: Bytes::from_static(b"k7"),
                port: 9092,
            }],
            topics: vec![response::Topic {
                error_code: KafkaCode::None,
                name: Bytes::from_static(b"t"),
                partitions: vec![response::Partition {
                    error_code: KafkaCode::None,
                    partition_index: 0,
                    leader_id: 7,
                    replica_nodes: vec![7],
                    isr_nodes: vec![7],
                }],
            }],
        };

        let x = response::parse_metadata_response(NomBytes::new(Bytes::from_static(b)))
            .unwrap()
            .1;

        assert_eq!(res, x);
    }
}
