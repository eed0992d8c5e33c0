//! Alias write validation and request rewriting through the gateway.

#[cfg(test)]
mod tests {
    use aliasgate_core::interceptor::ORIGINAL_PATH_HEADER;
    use aliasgate_model::ContainerRef;
    use http::{Method, StatusCode};

    use crate::{Gateway, body_text};

    async fn create_container(gw: &Gateway, path: &str) {
        let resp = gw.send(Method::PUT, path, &[]).await;
        assert_eq!(resp.status(), StatusCode::CREATED, "PUT {path}");
    }

    #[tokio::test]
    async fn test_should_set_alias_on_empty_container() {
        let gw = Gateway::new();
        create_container(&gw, "/v1/a/c").await;

        let resp = gw
            .send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "/v1/a2/c2")])
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let info = gw.cluster.container(&ContainerRef::new("a", "c")).unwrap();
        assert_eq!(info.alias(), Some("/v1/a2/c2"));
    }

    #[tokio::test]
    async fn test_should_reject_alias_on_container_with_objects() {
        let gw = Gateway::new();
        create_container(&gw, "/v1/a/c").await;
        gw.send(Method::PUT, "/v1/a/c/o", &[]).await;

        let resp = gw
            .send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "/v1/a2/c2")])
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("cannot be aliased"));

        let info = gw.cluster.container(&ContainerRef::new("a", "c")).unwrap();
        assert_eq!(info.alias(), None);
    }

    #[tokio::test]
    async fn test_should_reject_alias_chain() {
        let gw = Gateway::new();
        create_container(&gw, "/v1/a/c").await;
        create_container(&gw, "/v1/a2/c2").await;
        gw.send(
            Method::POST,
            "/v1/a2/c2",
            &[("X-Container-Meta-Storage-Path", "/v1/a3/c3")],
        )
        .await;

        let resp = gw
            .send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "/v1/a2/c2")])
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_write_alias_on_aliased_container_itself() {
        let gw = Gateway::new();
        create_container(&gw, "/v1/a/c").await;
        create_container(&gw, "/v1/a2/c2").await;
        gw.send(Method::PUT, "/v1/a2/c2/o", &[]).await;
        gw.send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "/v1/a2/c2")])
            .await;

        let resp = gw
            .send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "/v1/a3/c3")])
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let target = gw.cluster.container(&ContainerRef::new("a2", "c2")).unwrap();
        assert_eq!(target.alias(), None);
        assert_eq!(target.object_count, 1);
        let alias = gw.cluster.container(&ContainerRef::new("a", "c")).unwrap();
        assert_eq!(alias.alias(), Some("/v1/a3/c3"));

        gw.send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "")])
            .await;
        let alias = gw.cluster.container(&ContainerRef::new("a", "c")).unwrap();
        assert_eq!(alias.alias(), None);
    }

    #[tokio::test]
    async fn test_should_rewrite_object_request_to_alias_target() {
        let gw = Gateway::new();
        create_container(&gw, "/v1/a/c").await;
        create_container(&gw, "/v1/a2/c2").await;
        gw.send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "/v1/a2/c2")])
            .await;

        let resp = gw.send(Method::PUT, "/v1/a/c/o", &[]).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let last = gw.cluster.requests().pop().unwrap();
        assert_eq!(last.path, "/v1/a2/c2/o");
        assert_eq!(last.header(ORIGINAL_PATH_HEADER), Some("/v1/a/c/o"));

        let resp = gw.send(Method::GET, "/v1/a/c/o", &[]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let target = gw.cluster.container(&ContainerRef::new("a2", "c2")).unwrap();
        assert_eq!(target.object_count, 1);
    }

    #[tokio::test]
    async fn test_should_delete_alias_container_literally() {
        let gw = Gateway::new();
        create_container(&gw, "/v1/a/c").await;
        create_container(&gw, "/v1/a2/c2").await;
        gw.send(Method::POST, "/v1/a/c", &[("X-Container-Meta-Alias", "/v1/a2/c2")])
            .await;

        let resp = gw.send(Method::HEAD, "/v1/a/c", &[]).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = gw.send(Method::DELETE, "/v1/a/c", &[]).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(gw.cluster.container(&ContainerRef::new("a", "c")).is_none());
        assert!(gw.cluster.container(&ContainerRef::new("a2", "c2")).is_some());
    }

    #[tokio::test]
    async fn test_should_follow_object_alias_but_not_on_delete() {
        let gw = Gateway::new();
        create_container(&gw, "/v1/a/c").await;
        create_container(&gw, "/v1/a2/c2").await;
        gw.send(Method::PUT, "/v1/a2/c2/real", &[]).await;
        gw.send(Method::PUT, "/v1/a/c/link", &[]).await;

        let resp = gw
            .send(Method::POST, "/v1/a/c/link", &[("X-Object-Meta-Alias", "/v1/a2/c2/real")])
            .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        gw.send(Method::GET, "/v1/a/c/link", &[]).await;
        assert_eq!(gw.cluster.requests().pop().unwrap().path, "/v1/a2/c2/real");

        let resp = gw.send(Method::DELETE, "/v1/a/c/link", &[]).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(gw.cluster.requests().pop().unwrap().path, "/v1/a/c/link");
    }

    #[tokio::test]
    async fn test_should_pass_through_non_storage_paths() {
        let gw = Gateway::new();
        let resp = gw.send(Method::GET, "/info", &[]).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = gw.send(Method::GET, "/healthcheck", &[]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "OK");
    }
}
