//! Conversions from external infrastructure errors into domain errors.

use csv::Error as CsvError;
use moduleo_domain::ModuleoError;
use reqwest::Error as HttpError;
use std::io::Error as IoError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ModuleoError);

impl From<InfraError> for ModuleoError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ModuleoError> for InfraError {
    fn from(value: ModuleoError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoModuleoError {
    fn into_moduleo(self) -> ModuleoError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ModuleoError */
/* -------------------------------------------------------------------------- */

impl IntoModuleoError for HttpError {
    fn into_moduleo(self) -> ModuleoError {
        if self.is_timeout() {
            return ModuleoError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return ModuleoError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => ModuleoError::Api(message),
                404 => ModuleoError::NotFound(message),
                429 => ModuleoError::Network(message),
                400..=499 => ModuleoError::InvalidInput(message),
                _ => ModuleoError::Network(message),
            };
        }

        if self.is_decode() {
            return ModuleoError::DataShape(format!("failed to decode response body: {self}"));
        }

        ModuleoError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_moduleo())
    }
}

/* -------------------------------------------------------------------------- */
/* csv::Error → ModuleoError */
/* -------------------------------------------------------------------------- */

impl IntoModuleoError for CsvError {
    fn into_moduleo(self) -> ModuleoError {
        ModuleoError::Artifact(format!("CSV error: {self}"))
    }
}

impl From<CsvError> for InfraError {
    fn from(value: CsvError) -> Self {
        InfraError(value.into_moduleo())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → ModuleoError */
/* -------------------------------------------------------------------------- */

impl IntoModuleoError for IoError {
    fn into_moduleo(self) -> ModuleoError {
        match self.kind() {
            std::io::ErrorKind::NotFound => {
                ModuleoError::NotFound(format!("file not found: {self}"))
            }
            _ => ModuleoError::Artifact(format!("I/O error: {self}")),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_moduleo())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::Client;
    use tokio::runtime::Runtime;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = IoError::new(std::io::ErrorKind::NotFound, "missing artifact");
        let mapped: ModuleoError = InfraError::from(err).into();
        assert!(matches!(mapped, ModuleoError::NotFound(_)));
    }

    #[test]
    fn io_other_maps_to_artifact_error() {
        let err = IoError::new(std::io::ErrorKind::PermissionDenied, "denied");
        let mapped: ModuleoError = InfraError::from(err).into();
        assert!(matches!(mapped, ModuleoError::Artifact(_)));
    }

    #[test]
    fn http_status_401_maps_to_api_error() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: ModuleoError = InfraError::from(error).into();
            match mapped {
                ModuleoError::Api(msg) => assert!(msg.contains("401")),
                other => panic!("expected api error, got {:?}", other),
            }
        });
    }

    #[test]
    fn http_status_404_maps_to_not_found() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: ModuleoError = InfraError::from(error).into();
            assert!(matches!(mapped, ModuleoError::NotFound(_)));
        });
    }
}
