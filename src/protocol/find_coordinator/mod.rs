//! Locate the current coordinator of a group or transactional producer.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use nombytes::NomBytes;

    use super::*;
    use crate::error::{Error, KafkaCode};

    #[test]
    fn encode_v0() {
        let b = [0, 8, 66, 105, 103, 32, 68, 111, 103, 115];

        let req =
            request::FindCoordinatorRequest::new("Big Dogs", request::CoordinatorType::Group, 0)
                .unwrap();
        let kafka_request = req.into_request().unwrap();

        assert_eq!(kafka_request.version, 0);
        assert_eq!(kafka_request.body, Bytes::copy_from_slice(&b));
    }

    #[test]
    fn encode_v1_carries_key_type() {
        let b = [0, 4, 116, 120, 110, 49, 1];

        let req =
            request::FindCoordinatorRequest::new("txn1", request::CoordinatorType::Transaction, 1)
                .unwrap();
        let kafka_request = req.into_request().unwrap();

        assert_eq!(kafka_request.version, 1);
        assert_eq!(kafka_request.body, Bytes::copy_from_slice(&b));
    }

    #[test]
    fn v0_cannot_name_a_transaction_coordinator() {
        let err =
            request::FindCoordinatorRequest::new("txn1", request::CoordinatorType::Transaction, 0)
                .unwrap_err();

        assert!(matches!(err, Error::BadVersion(_)));
    }

    #[test]
    fn parse_v0() {
        let b = b"\0\0\0\0\0\x01\0\tlocalhost\0\0#\x84";

        let res = response::FindCoordinatorResponse {
            throttle_time_ms: None,
            error_code: KafkaCode::None,
            error_message: None,
            node_id: 1,
            host: Bytes::from_static(b"localhost"),
            port: 9092,
        };

        let x = response::parse_find_coordinator_response(0)(NomBytes::new(Bytes::from_static(b)))
            .unwrap()
            .1;

        assert_eq!(res, x);
    }

    #[test]
    fn parse_v1() {
        let b = b"\0\0\0\x64\0\x0f\xff\xff\0\0\0\x02\0\x02k2\0\0\x23\x85";

        let res = response::FindCoordinatorResponse {
            throttle_time_ms: Some(100),
            error_code: KafkaCode::CoordinatorNotAvailable,
            error_message: None,
            node_id: 2,
            host: Bytes::from_static(b"k2"),
            port: 9093,
        };

        let x = response::parse_find_coordinator_response(1)(NomBytes::new(Bytes::from_static(b)))
            .unwrap()
            .1;

        assert_eq!(res, x);
    }
}
