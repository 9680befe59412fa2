use crate::mgmt::ServiceCredential;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub credential: ServiceCredential,
    pub web_root: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(credential: ServiceCredential, web_root: String) -> Self {
        Self {
            credential,
            web_root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::{ExposeSecret, SecretString};

    #[test]
    fn test_global_args() {
        let credential = ServiceCredential::new(
            "tenant.auth0.com".to_string(),
            "https://api.forno.dev".to_string(),
            "m2m-id".to_string(),
            SecretString::from("m2m-secret"),
        );
        let args = GlobalArgs::new(credential, "public".to_string());
        assert_eq!(args.credential.domain, "tenant.auth0.com");
        assert_eq!(args.credential.client_id, "m2m-id");
        assert_eq!(args.credential.client_secret.expose_secret(), "m2m-secret");
        assert_eq!(args.web_root, "public");
    }
}
