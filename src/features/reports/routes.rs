use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::features::reports::handlers::{self, ReportState};
use crate::features::reports::services::{LedgerService, LinkReconciler, ReportService};

/// Create routes for the reports feature
///
/// All routes require the auth middleware to be applied by the caller
pub fn routes(
    report_service: Arc<ReportService>,
    link_reconciler: Arc<LinkReconciler>,
    ledger_service: Arc<LedgerService>,
) -> Router {
    let state = ReportState {
        report_service,
        link_reconciler,
        ledger_service,
    };

    Router::new()
        .route("/api/reports", get(handlers::list_reports))
        .route("/api/reports/draft", post(handlers::create_draft))
        .route("/api/reports/mine", get(handlers::list_my_reports))
        .route(
            "/api/reports/pending-facts",
            get(handlers::count_pending_facts),
        )
        .route(
            "/api/reports/{id}",
            get(handlers::get_report).patch(handlers::update_report),
        )
        .route(
            "/api/reports/{id}/status",
            patch(handlers::update_report_status),
        )
        .route(
            "/api/reports/{id}/resources",
            put(handlers::set_report_resources),
        )
        .route(
            "/api/reports/{id}/resources/{resource_id}",
            delete(handlers::remove_report_resource),
        )
        .route(
            "/api/reports/{id}/resources/{resource_id}/plan",
            put(handlers::set_plan),
        )
        .route(
            "/api/resources/{name}/attach",
            post(handlers::attach_resource),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::AuthenticatedUser;
    use crate::features::reports::repositories::{MemoryReportRepository, ReportRepository};
    use crate::features::reports::services::{FactRequestQueue, FactRequestReceiver};
    use crate::shared::test_helpers::{create_client_user, create_moderator_user, with_auth};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use fake::faker::address::en::CityName;
    use fake::Fake;
    use serde_json::{json, Value};

    struct Harness {
        router: Router,
        repo: Arc<MemoryReportRepository>,
        receiver: FactRequestReceiver,
        client: AuthenticatedUser,
        moderator: AuthenticatedUser,
    }

    impl Harness {
        fn new() -> Self {
            let repo = Arc::new(MemoryReportRepository::new());
            let moderator = create_moderator_user();
            repo.add_moderator(moderator.user_id);
            repo.add_resource("titanium", Some("Mare Orientale"));
            repo.add_resource("thorium", None);

            let (queue, receiver) = FactRequestQueue::with_capacity(16);
            let ledger = Arc::new(LedgerService::new(repo.clone(), queue));
            let router = routes(
                Arc::new(ReportService::new(repo.clone(), ledger.clone())),
                Arc::new(LinkReconciler::new(repo.clone())),
                ledger,
            );

            Self {
                router,
                repo,
                receiver,
                client: create_client_user(),
                moderator,
            }
        }

        fn as_user(&self, user: &AuthenticatedUser) -> TestServer {
            TestServer::new(with_auth(self.router.clone(), user.clone())).unwrap()
        }

        async fn draft_id(&self, server: &TestServer) -> String {
            let response = server.post("/api/reports/draft").await;
            assert_eq!(response.status_code(), StatusCode::OK);
            response.json::<Value>()["data"]["id"]
                .as_str()
                .unwrap()
                .to_string()
        }
    }

    #[tokio::test]
    async fn test_report_lifecycle_over_http() {
        let mut h = Harness::new();
        let client = h.as_user(&h.client);
        let moderator = h.as_user(&h.moderator);
        let id = h.draft_id(&client).await;

        let place: String = CityName().fake();
        let response = client
            .patch(&format!("/api/reports/{id}"))
            .json(&json!({ "place": place, "month": "2024-02" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["data"]["place"], place);

        let response = client
            .put(&format!("/api/reports/{id}/resources"))
            .json(&json!({ "resources": ["Titanium", "thorium"] }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let links = response.json::<Value>()["data"].as_array().unwrap().clone();
        assert_eq!(links.len(), 2);
        let resource_id = links[0]["resource_id"].as_str().unwrap().to_string();

        let response = client
            .patch(&format!("/api/reports/{id}/status"))
            .json(&json!({ "status": "under_review" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["data"]["status"], "under_review");
        assert!(!body["data"]["processed_at"].is_null());

        let response = moderator
            .patch(&format!("/api/reports/{id}/status"))
            .json(&json!({ "status": "approved" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(!response.json::<Value>()["data"]["finished_at"].is_null());

        assert!(h.receiver.recv().await.is_some());
        assert!(h.receiver.recv().await.is_some());
        assert!(h.receiver.try_recv().is_err());

        let response = moderator
            .put(&format!("/api/reports/{id}/resources/{resource_id}/plan"))
            .json(&json!({ "plan": 50 }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let response = client.get(&format!("/api/reports/{id}")).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let resources = response.json::<Value>()["data"]["resources"].clone();
        let planned = resources
            .as_array()
            .unwrap()
            .iter()
            .find(|l| l["resource_id"] == resource_id.as_str())
            .unwrap();
        assert_eq!(planned["plan"], 50.0);

        let response = client
            .put(&format!("/api/reports/{id}/resources"))
            .json(&json!({ "resources": [] }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_client_cannot_approve() {
        let h = Harness::new();
        let client = h.as_user(&h.client);
        let id = h.draft_id(&client).await;

        let response = client
            .patch(&format!("/api/reports/{id}/status"))
            .json(&json!({ "status": "approved" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Forbidden");
    }

    #[tokio::test]
    async fn test_unknown_status_is_bad_request() {
        let h = Harness::new();
        let client = h.as_user(&h.client);
        let id = h.draft_id(&client).await;

        let response = client
            .patch(&format!("/api/reports/{id}/status"))
            .json(&json!({ "status": "archived" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_report_visibility() {
        let h = Harness::new();
        let client = h.as_user(&h.client);
        let id = h.draft_id(&client).await;

        let stranger = h.as_user(&create_client_user());
        let response = stranger.get(&format!("/api/reports/{id}")).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = client
            .get(&format!("/api/reports/{}", uuid::Uuid::new_v4()))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_role_guards() {
        let h = Harness::new();
        let client = h.as_user(&h.client);
        let moderator = h.as_user(&h.moderator);

        let response = moderator.post("/api/reports/draft").await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = client.get("/api/reports/pending-facts").await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = moderator.get("/api/reports/pending-facts").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["data"]["pending"], 0);
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let h = Harness::new();
        let server = TestServer::new(h.router.clone()).unwrap();

        let response = server.get("/api/reports").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_reports_rejects_bad_dates() {
        let h = Harness::new();
        let client = h.as_user(&h.client);
        h.draft_id(&client).await;

        let response = client.get("/api/reports?date_from=yesterday").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = client
            .get("/api/reports?date_from=2024-02-01&date_to=2024-01-01")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = client.get("/api/reports").await;
        let body = response.json::<Value>();
        assert_eq!(body["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_attach_from_resource_page() {
        let h = Harness::new();
        let client = h.as_user(&h.client);

        let response = client.post("/api/resources/TITANIUM/attach").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["data"]["status"], "draft");
        assert_eq!(body["data"]["place"], "Mare Orientale");
        assert_eq!(body["data"]["resources"].as_array().unwrap().len(), 1);

        let response = client.post("/api/resources/unobtainium/attach").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = client.get("/api/reports/mine").await;
        assert_eq!(response.json::<Value>()["meta"]["total"], 1);

        let report_id = body["data"]["id"].as_str().unwrap().parse().unwrap();
        assert_eq!(h.repo.list_links(report_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_single_resource() {
        let h = Harness::new();
        let client = h.as_user(&h.client);
        let id = h.draft_id(&client).await;

        let response = client
            .put(&format!("/api/reports/{id}/resources"))
            .json(&json!({ "resources": ["titanium"] }))
            .await;
        let resource_id = response.json::<Value>()["data"][0]["resource_id"]
            .as_str()
            .unwrap()
            .to_string();

        let path = format!("/api/reports/{id}/resources/{resource_id}");
        assert_eq!(client.delete(&path).await.status_code(), StatusCode::OK);
        assert_eq!(client.delete(&path).await.status_code(), StatusCode::NOT_FOUND);
    }
}
