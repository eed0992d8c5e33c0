//! Shadow container propagation driven by read-ACL changes.

#[cfg(test)]
mod tests {
    use aliasgate_core::AliasGateConfig;
    use aliasgate_model::ContainerRef;
    use http::{Method, StatusCode};

    use crate::Gateway;

    fn shadow(account: &str) -> ContainerRef {
        ContainerRef::new(account, "SHARED_AUTH_test_c")
    }

    async fn source(gw: &Gateway) {
        let resp = gw.send(Method::PUT, "/v1/AUTH_test/c", &[]).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_should_create_shadow_for_each_granted_account() {
        let gw = Gateway::new();
        source(&gw).await;

        let resp = gw
            .send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u1,u2:bob")])
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        for account in ["AUTH_u1", "AUTH_u2"] {
            let info = gw.cluster.container(&shadow(account)).unwrap();
            assert_eq!(info.alias(), Some("/v1/AUTH_test/c"));
        }
        let info = gw.cluster.container(&ContainerRef::new("AUTH_test", "c")).unwrap();
        assert_eq!(info.read_acl, "u1,u2:bob");
    }

    #[tokio::test]
    async fn test_should_read_source_objects_through_shadow() {
        let gw = Gateway::new();
        source(&gw).await;
        gw.send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u2")])
            .await;
        gw.send(Method::PUT, "/v1/AUTH_test/c/report.csv", &[]).await;

        let resp = gw
            .send(Method::GET, "/v1/AUTH_u2/SHARED_AUTH_test_c/report.csv", &[])
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            gw.cluster.requests().pop().unwrap().path,
            "/v1/AUTH_test/c/report.csv"
        );
    }

    #[tokio::test]
    async fn test_should_only_create_added_and_delete_removed() {
        let gw = Gateway::new();
        source(&gw).await;
        gw.send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u1,u3")])
            .await;
        gw.cluster.clear_requests();

        gw.send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u1,u2")])
            .await;

        let issued: Vec<(Method, String)> = gw
            .cluster
            .requests()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        assert_eq!(
            issued,
            vec![
                (Method::POST, "/v1/AUTH_test/c".to_owned()),
                (
                    Method::DELETE,
                    "/v1/AUTH_u3/SHARED_AUTH_test_c".to_owned()
                ),
                (Method::PUT, "/v1/AUTH_u2/SHARED_AUTH_test_c".to_owned()),
            ]
        );
        assert!(gw.cluster.container(&shadow("AUTH_u3")).is_none());
        assert!(gw.cluster.container(&shadow("AUTH_u1")).is_some());
    }

    #[tokio::test]
    async fn test_should_not_create_shadow_in_source_account() {
        let gw = Gateway::new();
        source(&gw).await;

        gw.send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "test,u2")])
            .await;

        assert!(gw.cluster.container(&shadow("AUTH_test")).is_none());
        assert!(gw.cluster.container(&shadow("AUTH_u2")).is_some());
    }

    #[tokio::test]
    async fn test_should_ignore_client_supplied_remote_user() {
        let gw = Gateway::new();
        source(&gw).await;

        gw.send(
            Method::POST,
            "/v1/AUTH_test/c",
            &[("X-Container-Read", "u2"), ("X-Remote-User", "u2:anything")],
        )
        .await;

        assert!(gw.cluster.container(&shadow("AUTH_u2")).is_some());
        let forwarded = gw
            .cluster
            .requests()
            .into_iter()
            .find(|r| r.method == Method::POST)
            .unwrap();
        assert_eq!(forwarded.header("x-remote-user"), None);
    }

    #[tokio::test]
    async fn test_should_honor_remote_user_from_trusted_layer() {
        let config = AliasGateConfig::builder().trust_remote_user(true).build();
        let gw = Gateway::with_config(&config);
        source(&gw).await;

        gw.send(
            Method::POST,
            "/v1/AUTH_test/c",
            &[("X-Container-Read", "u1,u2"), ("X-Remote-User", "u2:admin")],
        )
        .await;

        assert!(gw.cluster.container(&shadow("AUTH_u1")).is_some());
        assert!(gw.cluster.container(&shadow("AUTH_u2")).is_none());
    }

    #[tokio::test]
    async fn test_should_not_create_shadow_when_post_fails() {
        let gw = Gateway::new();

        let resp = gw
            .send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u2")])
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(gw.cluster.container(&shadow("AUTH_u2")).is_none());
        assert_eq!(gw.cluster.container_count(), 0);
    }

    #[tokio::test]
    async fn test_should_keep_shadows_when_delete_conflicts() {
        let gw = Gateway::new();
        source(&gw).await;
        gw.send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u1")])
            .await;
        gw.send(Method::PUT, "/v1/AUTH_test/c/o", &[]).await;

        let resp = gw.send(Method::DELETE, "/v1/AUTH_test/c", &[]).await;

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let source = gw.cluster.container(&ContainerRef::new("AUTH_test", "c")).unwrap();
        assert_eq!(source.read_acl, "u1");
        assert!(gw.cluster.container(&shadow("AUTH_u1")).is_some());
    }

    #[tokio::test]
    async fn test_should_sync_acl_posted_through_shadow() {
        let gw = Gateway::new();
        source(&gw).await;
        gw.send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u2")])
            .await;

        let resp = gw
            .send(
                Method::POST,
                "/v1/AUTH_u2/SHARED_AUTH_test_c",
                &[("X-Container-Read", "u2,u3")],
            )
            .await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let source = gw.cluster.container(&ContainerRef::new("AUTH_test", "c")).unwrap();
        assert_eq!(source.read_acl, "u2,u3");
        let own_shadow = gw.cluster.container(&shadow("AUTH_u2")).unwrap();
        assert_eq!(own_shadow.read_acl, "");
        assert!(gw.cluster.container(&shadow("AUTH_u3")).is_some());
        assert!(
            gw.cluster
                .container(&ContainerRef::new("AUTH_u3", "SHARED_AUTH_u2_SHARED_AUTH_test_c"))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_should_remove_all_shadows_when_source_deleted() {
        let gw = Gateway::new();
        source(&gw).await;
        gw.send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u1,u2")])
            .await;

        let resp = gw.send(Method::DELETE, "/v1/AUTH_test/c", &[]).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        assert!(gw.cluster.container(&shadow("AUTH_u1")).is_none());
        assert!(gw.cluster.container(&shadow("AUTH_u2")).is_none());
        assert_eq!(gw.cluster.container_count(), 0);
    }

    #[tokio::test]
    async fn test_should_keep_request_alive_when_shadow_creation_fails() {
        let gw = Gateway::new();
        source(&gw).await;
        gw.cluster.fail_path_prefix("/v1/AUTH_u1/");

        let resp = gw
            .send(Method::POST, "/v1/AUTH_test/c", &[("X-Container-Read", "u1,u2")])
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(gw.cluster.container(&shadow("AUTH_u1")).is_none());
        assert!(gw.cluster.container(&shadow("AUTH_u2")).is_some());
    }
}
