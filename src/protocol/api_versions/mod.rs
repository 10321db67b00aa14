//! Ask a broker which API versions it speaks.

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
        let req = request::ApiVersionsRequest::new();
        let kafka_request = req.into_request().unwrap();

        // version 0 has an empty body
        assert!(kafka_request.body.is_empty());
    }

    #[test]
    fn parse() {
        let b = b"\0\0\0\0\0\x02\0\x03\0\0\0\x08\0\x0a\0\0\0\x01";

        let res = response::ApiVersionsResponse {
            error_code: KafkaCode::None,
            api_keys: vec![
                response::ApiVersion {
                    api_key: 3,
                    min_version: 0,
                    max_version: 8,
                },
                response::ApiVersion {
                    api_key: 10,
                    min_version: 0,
                    max_version: 1,
                },
            ],
        };

        let x = response::parse_api_versions_response(NomBytes::new(Bytes::from_static(b)))
            .unwrap()
            .1;

        assert_eq!(res, x);
    }
}
