//! Apps API handlers and the default route table.

use std::sync::Arc;

use apps_directory::{ApplicationSource, DirectoryEngine, DirectoryError, UserDirectory};
use apps_protocol::{ApiError, HandlerResult, PlugReply, PlugRequest, Routes, Verbs};

use crate::router::{Handler, Router, RouterError};

/// Record `err` in the reply and hand it back for the router to log.
fn fail(reply: &mut PlugReply, err: DirectoryError) -> HandlerResult {
    let err = ApiError::from(err);
    reply.fail(&err);
    Err(err)
}

/// `GET /api/apps` — regenerate, then list every application connection.
pub struct ListApplications<S, U> {
    engine: Arc<DirectoryEngine<S, U>>,
}

impl<S, U> ListApplications<S, U> {
    pub fn new(engine: Arc<DirectoryEngine<S, U>>) -> Self {
        Self { engine }
    }
}

impl<S, U> Handler for ListApplications<S, U>
where
    S: ApplicationSource + 'static,
    U: UserDirectory + 'static,
{
    async fn handle(&self, _request: &PlugRequest, reply: &mut PlugReply, _param: &str) -> HandlerResult {
        reply.begin_json();
        match self.engine.list_all_connections().await {
            Ok(connections) => reply.set_json(&connections),
            Err(e) => fail(reply, e),
        }
    }

    fn name(&self) -> &str {
        "ListApplications"
    }
}

/// `GET /api/apps/{logon}` — connections of one account.
pub struct ListUserApplications<S, U> {
    engine: Arc<DirectoryEngine<S, U>>,
}

impl<S, U> ListUserApplications<S, U> {
    pub fn new(engine: Arc<DirectoryEngine<S, U>>) -> Self {
        Self { engine }
    }
}

impl<S, U> Handler for ListUserApplications<S, U>
where
    S: ApplicationSource + 'static,
    U: UserDirectory + 'static,
{
    async fn handle(&self, _request: &PlugRequest, reply: &mut PlugReply, param: &str) -> HandlerResult {
        reply.begin_json();
        match self.engine.list_connections_for_user(param).await {
            Ok(connections) => reply.set_json(&connections),
            Err(e) => fail(reply, e),
        }
    }

    fn name(&self) -> &str {
        "ListUserApplications"
    }
}

/// `DELETE /api/apps/{alias}` — unpublish a remote application.
pub struct UnpublishApplication<S, U> {
    engine: Arc<DirectoryEngine<S, U>>,
}

impl<S, U> UnpublishApplication<S, U> {
    pub fn new(engine: Arc<DirectoryEngine<S, U>>) -> Self {
        Self { engine }
    }
}

impl<S, U> Handler for UnpublishApplication<S, U>
where
    S: ApplicationSource + 'static,
    U: UserDirectory + 'static,
{
    async fn handle(&self, _request: &PlugRequest, reply: &mut PlugReply, param: &str) -> HandlerResult {
        reply.begin_json();
        match self.engine.unpublish_application(param).await {
            Ok(outcome) => reply.set_json(&outcome),
            Err(e) => fail(reply, e),
        }
    }

    fn name(&self) -> &str {
        "UnpublishApplication"
    }
}

/// The apps API route table. Order matters: every match fires.
pub fn apps_router<S, U>(engine: Arc<DirectoryEngine<S, U>>) -> Result<Router, RouterError>
where
    S: ApplicationSource + 'static,
    U: UserDirectory + 'static,
{
    let mut router = Router::new();
    router
        .route(Routes::APPS, Verbs::GET, ListApplications::new(engine.clone()))?
        .route(Routes::APP, Verbs::DELETE, UnpublishApplication::new(engine.clone()))?
        .route(Routes::APP, Verbs::GET, ListUserApplications::new(engine))?;
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apps_directory::{
        ApplicationDescriptor, Connection, DirectoryConfig, StaticUserDirectory, UserAccount,
    };
    use apps_protocol::JSON_CONTENT_TYPE;
    use parking_lot::Mutex;
    use std::path::Path;

    #[derive(Default)]
    struct StubSource {
        apps: Mutex<Vec<ApplicationDescriptor>>,
        unpublish_error: Option<String>,
    }

    impl ApplicationSource for StubSource {
        async fn discover_applications(&self) -> Result<Vec<ApplicationDescriptor>, DirectoryError> {
            Ok(self.apps.lock().clone())
        }

        async fn unpublish(&self, alias: &str, _collection: &str) -> Result<(), DirectoryError> {
            if let Some(msg) = &self.unpublish_error {
                return Err(DirectoryError::CommandFailed(msg.clone()));
            }
            self.apps.lock().retain(|a| a.alias != alias);
            Ok(())
        }
    }

    type Engine = DirectoryEngine<StubSource, StaticUserDirectory>;

    fn engine_in(dir: &Path, source: StubSource) -> Arc<Engine> {
        let config = Arc::new(DirectoryConfig {
            server: "win1".into(),
            user: "Administrator".into(),
            password: "adminpw".into(),
            windows_domain: "CORP".into(),
            xml_configuration_file: dir.join("noauth-logins.xml"),
            ..Default::default()
        });
        let users = StaticUserDirectory::new(vec![UserAccount::new("a@x.com", "a", "p")]);
        Arc::new(DirectoryEngine::new(config, source, users))
    }

    fn calc() -> StubSource {
        StubSource {
            apps: Mutex::new(vec![ApplicationDescriptor::new("calc")]),
            ..Default::default()
        }
    }

    fn connections(reply: &PlugReply) -> Vec<Connection> {
        serde_json::from_str(reply.body.as_deref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn list_applications_regenerates_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), calc());
        let mut reply = PlugReply::default();
        ListApplications::new(engine.clone())
            .handle(&PlugRequest::new("GET", "/api/apps"), &mut reply, "")
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type(), Some(JSON_CONTENT_TYPE));
        let conns = connections(&reply);
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].connection_name, "calc_a@x.com");
        assert!(engine.store_path().exists());
    }

    #[tokio::test]
    async fn list_user_applications_without_store_fails_with_500() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), calc());
        let mut reply = PlugReply::default();
        let err = ListUserApplications::new(engine)
            .handle(&PlugRequest::new("GET", "/api/apps/a"), &mut reply, "a")
            .await
            .unwrap_err();

        assert_eq!(err.status(), 500);
        assert_eq!(reply.status, 500);
        assert!(reply.body.is_none());
        assert_eq!(reply.content_type(), Some(JSON_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn unpublish_reports_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), calc());
        let mut reply = PlugReply::default();
        UnpublishApplication::new(engine.clone())
            .handle(&PlugRequest::new("DELETE", "/api/apps/calc"), &mut reply, "calc")
            .await
            .unwrap();

        let body: serde_json::Value = serde_json::from_str(reply.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"alias": "calc", "status": "unpublished"}));
        assert!(engine.source().apps.lock().is_empty());
    }

    #[tokio::test]
    async fn unpublish_failure_is_still_200() {
        let dir = tempfile::tempdir().unwrap();
        let source = StubSource {
            unpublish_error: Some("not found".into()),
            ..calc()
        };
        let engine = engine_in(dir.path(), source);
        let mut reply = PlugReply::default();
        UnpublishApplication::new(engine)
            .handle(&PlugRequest::new("DELETE", "/api/apps/calc"), &mut reply, "calc")
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        let body: serde_json::Value = serde_json::from_str(reply.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["status"], "failed");
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn unpublish_rejects_empty_alias_with_400() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), calc());
        let mut reply = PlugReply::default();
        let err = UnpublishApplication::new(engine)
            .handle(&PlugRequest::new("DELETE", "/api/apps/"), &mut reply, " ")
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(reply.status, 400);
    }

    #[tokio::test]
    async fn default_table_routes_the_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), calc());
        let router = apps_router(engine).unwrap();
        assert_eq!(router.len(), 3);

        let all = router.dispatch(&PlugRequest::new("GET", "/api/apps")).await;
        assert_eq!(all.status, 200);

        let mine = router.dispatch(&PlugRequest::new("GET", "/api/apps/a")).await;
        let conns = connections(&mine);
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].hostname, "win1");
        assert_eq!(conns[0].username, "a@CORP");
        assert_eq!(conns[0].remote_app, "||calc");

        let none = router.dispatch(&PlugRequest::new("PUT", "/api/apps/a")).await;
        assert!(!none.is_handled());
    }
}
