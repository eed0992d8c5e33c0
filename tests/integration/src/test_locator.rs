//! Account resolution strategies selected by configuration.

#[cfg(test)]
mod tests {
    use aliasgate_core::{AliasGateConfig, LocatorStrategy};
    use aliasgate_model::ContainerRef;
    use http::{Method, StatusCode};

    use crate::Gateway;

    fn config(strategy: &str) -> AliasGateConfig {
        AliasGateConfig::from_lookup(|key| match key {
            "AUTH_METHOD" => Some(strategy.to_owned()),
            "RESELLER_PREFIX" => Some("AUTH".to_owned()),
            _ => None,
        })
    }

    async fn share_with(gw: &Gateway, reader: &str) {
        let resp = gw.send(Method::PUT, "/v1/AUTH_test/c", &[]).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let resp = gw
            .send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", reader)])
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_should_place_shadow_under_static_prefix() {
        let config = config("tempauth");
        assert_eq!(config.auth_method, LocatorStrategy::Tempauth);
        let gw = Gateway::with_config(&config);

        share_with(&gw, "u1").await;

        assert!(
            gw.cluster
                .container(&ContainerRef::new("AUTH_u1", "SHARED_AUTH_test_c"))
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_should_place_shadow_at_catalog_endpoint() {
        let gw = Gateway::with_config(&config("swauth"));
        gw.cluster.put_raw(
            "/v1/AUTH_.auth/u1/.services",
            concat!(
                r#"{"storage":{"default":"local","local":"http://swift:8080/v1/AUTH_7d21","#,
                r#""cluster_name":"http://swift:8080/v1/AUTH_7d21"}}"#,
            ),
        );

        share_with(&gw, "u1").await;

        assert!(
            gw.cluster
                .container(&ContainerRef::new("AUTH_7d21", "SHARED_AUTH_test_c"))
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_should_place_shadow_under_tenant_id() {
        let gw = Gateway::with_config(&config("keystone"));
        gw.cluster.add_tenant("u1", "0a9f33");

        share_with(&gw, "u1,ghost").await;

        assert!(
            gw.cluster
                .container(&ContainerRef::new("AUTH_0a9f33", "SHARED_AUTH_test_c"))
                .is_some()
        );
        assert_eq!(gw.cluster.container_count(), 2);
    }
}
