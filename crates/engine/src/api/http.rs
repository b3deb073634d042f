//! HTTP routes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainerhub_domain::{
    BatchId, InventoryLedger, Monster, MonsterId, OperationId, PastryValueKind, TrainerId,
};
use uuid::Uuid;

use crate::app::App;
use crate::stores::SharedSession;
use crate::use_cases::mass_edit::{
    BatchReport, ItemAvailability, MassEditError, MassEditSession, MassEditState,
    MonsterEditIntent, PreparedRun, SessionPhase, SpeciesSelectionRequest,
};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/mass-edit/batches", post(open_batch))
        .route(
            "/api/mass-edit/batches/{id}",
            get(get_batch).delete(delete_batch),
        )
        .route(
            "/api/mass-edit/batches/{id}/availability/{monster_id}",
            get(get_availability),
        )
        .route(
            "/api/mass-edit/batches/{id}/intents/{monster_id}",
            put(update_intent),
        )
        .route(
            "/api/mass-edit/batches/{id}/inventory/refresh",
            post(refresh_inventory),
        )
        .route("/api/mass-edit/batches/{id}/run", post(run_batch))
        .route(
            "/api/mass-edit/batches/{id}/species/complete",
            post(complete_species),
        )
        .route(
            "/api/mass-edit/batches/{id}/species/cancel",
            post(cancel_species),
        )
        .route(
            "/api/mass-edit/batches/{id}/species/{operation_id}",
            put(select_species),
        )
        .route("/api/mass-edit/batches/{id}/new", post(new_batch))
}

async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenBatchRequest {
    pub trainer_id: TrainerId,
    pub monsters: Vec<Monster>,
}

#[derive(Debug, Serialize)]
pub struct OpenBatchResponse {
    pub batch_id: BatchId,
    pub inventory: InventoryLedger,
}

#[derive(Debug, Deserialize)]
pub struct SelectSpeciesRequest {
    pub species: String,
}

#[derive(Debug, Deserialize)]
pub struct NewBatchRequest {
    pub monsters: Vec<Monster>,
}

#[derive(Debug, Serialize)]
pub struct IntentView {
    pub monster_id: MonsterId,
    #[serde(flatten)]
    pub intent: MonsterEditIntent,
}

/// Selectable items for every slot of one monster, in slot order.
#[derive(Debug, Serialize)]
pub struct AvailabilityView {
    pub monster_id: MonsterId,
    pub berries: Vec<Vec<ItemAvailability>>,
    pub pastries: Vec<Vec<ItemAvailability>>,
    /// Value the selected pastry asks for, per pastry slot
    pub pastry_values: Vec<Option<PastryValueKind>>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub batch_id: BatchId,
    pub trainer_id: TrainerId,
    pub state: SessionPhase,
    pub inventory: InventoryLedger,
    pub monsters: Vec<Monster>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub intents: Vec<IntentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SpeciesSelectionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BatchReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MassEditSession> for SessionView {
    fn from(session: &MassEditSession) -> Self {
        let intents = match session.state() {
            MassEditState::Edit(draft) => draft
                .monsters()
                .iter()
                .filter_map(|m| {
                    draft.intent(m.id).map(|intent| IntentView {
                        monster_id: m.id,
                        intent: intent.clone(),
                    })
                })
                .collect(),
            _ => Vec::new(),
        };
        Self {
            batch_id: session.id(),
            trainer_id: session.trainer_id(),
            state: session.phase(),
            inventory: session.ledger().clone(),
            monsters: session.monsters(),
            intents,
            selection: session.selection().ok().cloned(),
            report: session.report().ok().cloned(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

// =============================================================================
// Mass edit
// =============================================================================

async fn open_batch(
    State(app): State<Arc<App>>,
    Json(request): Json<OpenBatchRequest>,
) -> Result<(StatusCode, Json<OpenBatchResponse>), ApiError> {
    if request.monsters.is_empty() {
        return Err(ApiError::BadRequest("No monsters selected".to_string()));
    }
    let session = app
        .use_cases
        .mass_edit
        .mass_edit
        .open(request.trainer_id, request.monsters)
        .await?;
    let response = OpenBatchResponse {
        batch_id: session.id(),
        inventory: session.ledger().clone(),
    };
    app.stores.mass_edit.insert(session).await;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_batch(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = stored(&app, BatchId::from_uuid(id)).await?;
    let session = shared.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

async fn delete_batch(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.stores
        .mass_edit
        .remove(BatchId::from_uuid(id))
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_availability(
    State(app): State<Arc<App>>,
    Path((id, monster_id)): Path<(Uuid, i64)>,
) -> Result<Json<AvailabilityView>, ApiError> {
    let shared = stored(&app, BatchId::from_uuid(id)).await?;
    let session = shared.lock().await;
    let monster_id = MonsterId::new(monster_id);
    let draft = session.draft()?;
    let intent = draft.intent(monster_id).ok_or(ApiError::NotFound)?;
    let rules = app.rules.as_ref();
    let ledger = session.ledger();

    let berries = (0..intent.berries.len())
        .map(|slot| draft.available_berries(ledger, rules, monster_id, slot))
        .collect::<Result<Vec<_>, _>>()
        .map_err(MassEditError::from)?;
    let pastries = (0..intent.pastries.len())
        .map(|slot| draft.available_pastries(ledger, rules, monster_id, slot))
        .collect::<Result<Vec<_>, _>>()
        .map_err(MassEditError::from)?;
    let pastry_values = intent
        .pastries
        .iter()
        .map(|pastry| rules.pastry_value_kind(&pastry.pastry_type))
        .collect();

    Ok(Json(AvailabilityView {
        monster_id,
        berries,
        pastries,
        pastry_values,
    }))
}

async fn update_intent(
    State(app): State<Arc<App>>,
    Path((id, monster_id)): Path<(Uuid, i64)>,
    Json(intent): Json<MonsterEditIntent>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = transition(&app, BatchId::from_uuid(id)).await?;
    let mut session = shared.lock().await;
    session
        .draft_mut()?
        .set_intent(MonsterId::new(monster_id), intent)
        .map_err(MassEditError::from)?;
    Ok(Json(SessionView::from(&*session)))
}

async fn refresh_inventory(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = transition(&app, BatchId::from_uuid(id)).await?;
    let mut session = shared.lock().await;
    app.use_cases
        .mass_edit
        .mass_edit
        .refresh_inventory(&mut session)
        .await?;
    Ok(Json(SessionView::from(&*session)))
}

async fn run_batch(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let id = BatchId::from_uuid(id);
    let shared = transition(&app, id).await?;
    let prepared = app
        .use_cases
        .mass_edit
        .mass_edit
        .prepare_run(&mut *shared.lock().await)?;
    execute_detached(&app, id, shared, prepared).await
}

async fn select_species(
    State(app): State<Arc<App>>,
    Path((id, operation_id)): Path<(Uuid, String)>,
    Json(request): Json<SelectSpeciesRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = transition(&app, BatchId::from_uuid(id)).await?;
    let mut session = shared.lock().await;
    app.use_cases.mass_edit.mass_edit.resolve_species(
        &mut session,
        &OperationId::from(operation_id),
        &request.species,
    )?;
    Ok(Json(SessionView::from(&*session)))
}

async fn complete_species(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let id = BatchId::from_uuid(id);
    let shared = transition(&app, id).await?;
    let prepared = app
        .use_cases
        .mass_edit
        .mass_edit
        .prepare_species_completion(&mut *shared.lock().await)?;
    execute_detached(&app, id, shared, prepared).await
}

async fn cancel_species(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = transition(&app, BatchId::from_uuid(id)).await?;
    let mut session = shared.lock().await;
    app.use_cases
        .mass_edit
        .mass_edit
        .cancel_species_selection(&mut session)?;
    Ok(Json(SessionView::from(&*session)))
}

async fn new_batch(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<NewBatchRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = transition(&app, BatchId::from_uuid(id)).await?;
    let mut session = shared.lock().await;
    app.use_cases
        .mass_edit
        .mass_edit
        .start_new_batch(&mut session, request.monsters)?;
    Ok(Json(SessionView::from(&*session)))
}

async fn stored(app: &App, id: BatchId) -> Result<SharedSession, ApiError> {
    app.stores.mass_edit.get(id).await.ok_or(ApiError::NotFound)
}

/// Look a session up for a state change and restart its idle timer.
async fn transition(app: &App, id: BatchId) -> Result<SharedSession, ApiError> {
    let shared = stored(app, id).await?;
    app.stores.mass_edit.touch(id).await;
    Ok(shared)
}

/// Execute a prepared run on its own task and settle it into the session.
///
/// The session stays in the store reading `processing` while the service
/// calls run. The task owns the run, so a client that disconnects does not
/// lose the mutations already applied.
async fn execute_detached(
    app: &App,
    id: BatchId,
    shared: SharedSession,
    prepared: PreparedRun,
) -> Result<Json<SessionView>, ApiError> {
    let mass_edit = app.use_cases.mass_edit.mass_edit.clone();
    let store = app.stores.mass_edit.clone();

    let task = tokio::spawn(async move {
        let progress = mass_edit.execute(prepared).await;
        let mut session = shared.lock().await;
        let settled = mass_edit.settle(&mut session, progress);
        let view = SessionView::from(&*session);
        drop(session);
        store.touch(id).await;
        settled.map(|_| view)
    });

    let view = task
        .await
        .map_err(|e| ApiError::Internal(format!("Mass edit run aborted: {e}")))??;
    Ok(Json(view))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    /// A run is in flight for this batch
    Conflict(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<MassEditError> for ApiError {
    fn from(e: MassEditError) -> Self {
        match e {
            busy @ MassEditError::InvalidState {
                actual: SessionPhase::Processing,
                ..
            } => ApiError::Conflict(busy.to_string()),
            MassEditError::Inventory(e) => ApiError::Internal(e.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use tower::ServiceExt;
    use trainerhub_domain::MonsterPatch;

    use crate::app::Ports;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::config::EngineConfig;
    use crate::infrastructure::ports::{
        BerryOutcome, BerryRequest, MockInventoryPort, MockMonsterMutationPort,
        MockSpeciesImagePort, MockSpeciesRollerPort, MonsterMutationPort, MutationOutcome,
        PastryRequest, ServiceError,
    };

    fn ledger() -> InventoryLedger {
        InventoryLedger::new()
            .with_berry("Oran Berry", 1)
            .with_berry("Azzuk Berry", 1)
            .with_berry("Patama Berry", 1)
            .with_pastry("Miraca Pastry", 1)
    }

    fn succeeding_mutations() -> MockMonsterMutationPort {
        let mut mutations = MockMonsterMutationPort::new();
        mutations.expect_use_berry().returning(|request| {
            Ok(BerryOutcome::applied(MonsterPatch {
                species1: request.species,
                ..MonsterPatch::default()
            }))
        });
        mutations
    }

    /// Mutation service that holds every call until the gate opens.
    struct GatedMutations {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl MonsterMutationPort for GatedMutations {
        async fn rename(
            &self,
            _monster_id: MonsterId,
            new_name: String,
        ) -> Result<MutationOutcome, ServiceError> {
            self.gate.notified().await;
            Ok(MutationOutcome::applied(MonsterPatch::renamed(new_name)))
        }

        async fn use_pastry(&self, _request: PastryRequest) -> Result<MutationOutcome, ServiceError> {
            self.gate.notified().await;
            Ok(MutationOutcome::applied(MonsterPatch::default()))
        }

        async fn use_berry(&self, _request: BerryRequest) -> Result<BerryOutcome, ServiceError> {
            self.gate.notified().await;
            Ok(BerryOutcome::applied(MonsterPatch::default()))
        }
    }

    fn app_with(mutations: Arc<dyn MonsterMutationPort>) -> Arc<App> {
        let mut inventory = MockInventoryPort::new();
        inventory.expect_get_inventory().returning(|_| Ok(ledger()));
        let mut roller = MockSpeciesRollerPort::new();
        roller
            .expect_roll()
            .returning(|_| Ok(vec!["Charmander".to_string(), "Bulbasaur".to_string()]));
        let mut images = MockSpeciesImagePort::new();
        images.expect_lookup().returning(|_| {
            Ok(BTreeMap::from([(
                "Bulbasaur".to_string(),
                "https://img.test/bulbasaur.png".to_string(),
            )]))
        });

        let ports = Ports {
            inventory: Arc::new(inventory),
            mutations,
            roller: Arc::new(roller),
            images: Arc::new(images),
            clock: Arc::new(SystemClock::new()),
        };
        Arc::new(App::new(EngineConfig::default(), ports))
    }

    fn app() -> Arc<App> {
        app_with(Arc::new(succeeding_mutations()))
    }

    async fn send(
        app: &Arc<App>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = routes()
            .with_state(app.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn monsters() -> Value {
        json!([
            {"id": 1, "name": "Alpha", "species1": "Pikachu", "type1": "Electric"},
            {"id": 2, "name": "Beta", "species1": "Eevee", "type1": "Normal"}
        ])
    }

    async fn open(app: &Arc<App>) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/mass-edit/batches",
            Some(json!({"trainer_id": 7, "monsters": monsters()})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["inventory"]["berries"]["Oran Berry"], 1);
        body["batch_id"].as_str().unwrap().to_string()
    }

    async fn set_intent(app: &Arc<App>, id: &str, monster_id: i64, intent: Value) {
        let (status, _) = send(
            app,
            "PUT",
            &format!("/api/mass-edit/batches/{id}/intents/{monster_id}"),
            Some(intent),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn wait_for_state(app: &Arc<App>, id: &str, state: &str) -> Value {
        for _ in 0..200 {
            let (status, view) = send(app, "GET", &format!("/api/mass-edit/batches/{id}"), None).await;
            assert_eq!(status, StatusCode::OK, "batch disappeared");
            if view["state"] == state {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("batch never reached {state}");
    }

    /// Open a batch with one Patama Berry on Alpha and run it into species
    /// selection.
    async fn run_into_species_selection(app: &Arc<App>) -> String {
        let id = open(app).await;
        set_intent(
            app,
            &id,
            1,
            json!({"nickname": "Alpha", "berries": ["Patama Berry"], "pastries": []}),
        )
        .await;
        let (status, view) = send(app, "POST", &format!("/api/mass-edit/batches/{id}/run"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "species_selection");
        assert_eq!(
            view["selection"]["pending"][0]["candidates"],
            json!(["Charmander", "Bulbasaur"])
        );
        assert_eq!(
            view["selection"]["images"],
            json!({"Bulbasaur": "https://img.test/bulbasaur.png"})
        );
        id
    }

    #[tokio::test]
    async fn edit_and_run_a_batch() {
        let app = app();
        let id = open(&app).await;
        set_intent(
            &app,
            &id,
            1,
            json!({"nickname": "Alpha", "berries": ["Oran Berry"], "pastries": []}),
        )
        .await;

        let (status, view) = send(&app, "POST", &format!("/api/mass-edit/batches/{id}/run"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "results");
        assert_eq!(view["report"]["summary"]["success_count"], 1);
        assert_eq!(view["inventory"]["berries"]["Oran Berry"], 0);
        assert_eq!(view["report"]["results"][0]["message"], "Used Oran Berry on Alpha");
    }

    #[tokio::test]
    async fn availability_hides_items_held_elsewhere_and_names_pastry_values() {
        let app = app();
        let id = open(&app).await;
        set_intent(
            &app,
            &id,
            1,
            json!({
                "nickname": "Alpha",
                "berries": ["Oran Berry"],
                "pastries": [{"pastry_type": "Miraca Pastry", "value": ""}]
            }),
        )
        .await;

        let (status, alpha) = send(
            &app,
            "GET",
            &format!("/api/mass-edit/batches/{id}/availability/1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(alpha["pastry_values"], json!(["type"]));

        let (status, beta) = send(
            &app,
            "GET",
            &format!("/api/mass-edit/batches/{id}/availability/2"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            beta["berries"][0],
            json!([
                {"item": "Azzuk Berry", "remaining": 1},
                {"item": "Patama Berry", "remaining": 1}
            ])
        );
        assert_eq!(beta["pastry_values"], json!([null]));
    }

    #[tokio::test]
    async fn species_pick_then_complete_reaches_results() {
        let app = app();
        let id = run_into_species_selection(&app).await;

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/mass-edit/batches/{id}/species/1-berry-0"),
            Some(json!({"species": "Agumon"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, view) = send(
            &app,
            "PUT",
            &format!("/api/mass-edit/batches/{id}/species/1-berry-0"),
            Some(json!({"species": "Bulbasaur"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["selection"]["pending"][0]["selected"], "Bulbasaur");

        let (status, view) = send(
            &app,
            "POST",
            &format!("/api/mass-edit/batches/{id}/species/complete"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "results");
        assert_eq!(
            view["report"]["results"][0]["message"],
            "Used Patama Berry on Alpha (selected: Bulbasaur)"
        );
        assert_eq!(view["inventory"]["berries"]["Patama Berry"], 0);
        assert_eq!(view["monsters"][0]["species1"], "Bulbasaur");
    }

    #[tokio::test]
    async fn species_pick_then_cancel_returns_to_edit() {
        let app = app();
        let id = run_into_species_selection(&app).await;

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/mass-edit/batches/{id}/species/1-berry-0"),
            Some(json!({"species": "Charmander"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, view) = send(
            &app,
            "POST",
            &format!("/api/mass-edit/batches/{id}/species/cancel"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "edit");
        assert_eq!(view["inventory"]["berries"]["Patama Berry"], 1);
        assert_eq!(view["monsters"][0]["species1"], "Pikachu");
        assert_eq!(view["intents"][0]["berries"], json!([""]));
    }

    #[tokio::test]
    async fn refresh_and_new_batch_follow_the_session_state() {
        let app = app();
        let id = open(&app).await;

        let (status, view) = send(
            &app,
            "POST",
            &format!("/api/mass-edit/batches/{id}/inventory/refresh"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["inventory"]["pastries"]["Miraca Pastry"], 1);

        let new_batch = format!("/api/mass-edit/batches/{id}/new");
        let (status, _) = send(&app, "POST", &new_batch, Some(json!({"monsters": monsters()}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        set_intent(
            &app,
            &id,
            2,
            json!({"nickname": "Beta", "berries": ["Oran Berry"], "pastries": []}),
        )
        .await;
        send(&app, "POST", &format!("/api/mass-edit/batches/{id}/run"), None).await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/mass-edit/batches/{id}/inventory/refresh"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, view) = send(&app, "POST", &new_batch, Some(json!({"monsters": monsters()}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "edit");
        assert_eq!(view["inventory"]["berries"]["Oran Berry"], 0);
    }

    #[tokio::test]
    async fn run_survives_a_dropped_request_and_reads_processing_meanwhile() {
        let gate = Arc::new(Notify::new());
        let app = app_with(Arc::new(GatedMutations { gate: gate.clone() }));
        let id = open(&app).await;
        set_intent(
            &app,
            &id,
            1,
            json!({"nickname": "Alpha", "berries": ["Oran Berry"], "pastries": []}),
        )
        .await;

        let client = tokio::spawn({
            let app = app.clone();
            let uri = format!("/api/mass-edit/batches/{id}/run");
            async move { send(&app, "POST", &uri, None).await }
        });
        wait_for_state(&app, &id, "processing").await;

        let (status, _) = send(&app, "POST", &format!("/api/mass-edit/batches/{id}/run"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        client.abort();
        assert!(client.await.unwrap_err().is_cancelled());
        gate.notify_one();

        let view = wait_for_state(&app, &id, "results").await;
        assert_eq!(view["report"]["summary"]["success_count"], 1);
        assert_eq!(view["inventory"]["berries"]["Oran Berry"], 0);
    }

    #[tokio::test]
    async fn wrong_state_is_a_bad_request_and_session_survives() {
        let app = app();
        let id = open(&app).await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/mass-edit/batches/{id}/species/complete"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, view) = send(&app, "GET", &format!("/api/mass-edit/batches/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "edit");
    }

    #[tokio::test]
    async fn unknown_and_deleted_batches_are_not_found() {
        let app = app();
        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/mass-edit/batches/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = open(&app).await;
        let (status, _) = send(&app, "DELETE", &format!("/api/mass-edit/batches/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "POST", &format!("/api/mass-edit/batches/{id}/run"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn opening_without_monsters_or_with_repeats_is_rejected() {
        let app = app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/mass-edit/batches",
            Some(json!({"trainer_id": 7, "monsters": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/api/mass-edit/batches",
            Some(json!({
                "trainer_id": 7,
                "monsters": [
                    {"id": 1, "name": "Alpha", "species1": "Pikachu"},
                    {"id": 1, "name": "Alpha", "species1": "Pikachu"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
