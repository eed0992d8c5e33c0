//! Tests against a running gateway in front of a real Swift proxy.
//!
//! `ALIASGATE_AUTH_TOKEN` must hold a token valid for `ALIASGATE_ACCOUNT`.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::{endpoint_url, test_container_name};

    fn account_url() -> String {
        let account = std::env::var("ALIASGATE_ACCOUNT").unwrap_or_else(|_| "AUTH_test".to_owned());
        format!("{}/v1/{account}", endpoint_url())
    }

    fn token() -> String {
        std::env::var("ALIASGATE_AUTH_TOKEN").unwrap_or_default()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_answer_health_check() {
        let resp = reqwest::get(format!("{}/healthcheck", endpoint_url()))
            .await
            .expect("health check request");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_alias_on_populated_container() {
        let client = reqwest::Client::new();
        let container = format!("{}/{}", account_url(), test_container_name("alias"));

        client
            .put(&container)
            .header("x-auth-token", token())
            .send()
            .await
            .expect("create container");
        client
            .put(format!("{container}/o"))
            .header("x-auth-token", token())
            .body("data")
            .send()
            .await
            .expect("create object");

        let resp = client
            .post(&container)
            .header("x-auth-token", token())
            .header("x-container-meta-alias", "/v1/AUTH_other/c")
            .send()
            .await
            .expect("set alias");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let _ = client
            .delete(format!("{container}/o"))
            .header("x-auth-token", token())
            .send()
            .await;
        let _ = client
            .delete(&container)
            .header("x-auth-token", token())
            .send()
            .await;
    }
}
