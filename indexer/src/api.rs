use axum::{
    extract::{Path, State as AxumState},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use wyvern_execution::{
    load_battle, load_dragon, load_dragon_stat, load_gladiator_battle, load_snapshot,
    load_user_stat, State,
};
use wyvern_types::{
    dragon::{
        Battle, BattleHealthAndMana, DragonBattleSnapshot, DragonSkills, DragonSpecialSkill,
        DragonTactics,
    },
    execution::{Key, Value},
    Address, BattleId, DragonId, GladiatorBattleId, SnapshotId,
};

use crate::{Indexer, SqliteStore};

pub struct Api {
    indexer: Arc<Indexer>,
}

impl Api {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self { indexer }
    }

    pub fn router(&self) -> Router {
        // Read-only surface, so any origin may query it
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/healthz", get(healthz))
            .route("/stats", get(stats))
            .route("/dragons/:id", get(get_dragon))
            .route("/dragons/:id/stats", get(get_dragon_stats))
            .route("/users/:address/stats", get(get_user_stats))
            .route("/battles/:id", get(get_battle))
            .route("/snapshots/:id", get(get_snapshot))
            .route("/gladiator-battles/:id", get(get_gladiator_battle))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.indexer.clone())
    }
}

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

#[derive(Serialize)]
struct SnapshotView {
    #[serde(flatten)]
    snapshot: DragonBattleSnapshot,
    health_and_mana_record: Option<BattleHealthAndMana>,
    skills_record: Option<DragonSkills>,
    tactics_record: Option<DragonTactics>,
    special_attack_record: Option<DragonSpecialSkill>,
    special_defense_record: Option<DragonSpecialSkill>,
}

#[derive(Serialize)]
struct BattleView {
    #[serde(flatten)]
    battle: Battle,
    winner_snapshot: Option<SnapshotView>,
    looser_snapshot: Option<SnapshotView>,
    attacker_snapshot: Option<SnapshotView>,
    defender_snapshot: Option<SnapshotView>,
}

fn parse_id<T: FromStr>(raw: &str) -> Result<T, Response> {
    raw.parse()
        .map_err(|_| StatusCode::BAD_REQUEST.into_response())
}

fn internal_error(err: anyhow::Error) -> Response {
    warn!(?err, "store read failed");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Runs a read against the store and renders `Some` as JSON, `None` as 404.
fn read<T: Serialize>(
    indexer: &Indexer,
    query: impl FnOnce(&SqliteStore) -> anyhow::Result<Option<T>>,
) -> Response {
    let result = indexer.store().and_then(|store| query(&store));
    match result {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => internal_error(err),
    }
}

fn snapshot_view(store: &SqliteStore, id: SnapshotId) -> anyhow::Result<Option<SnapshotView>> {
    let Some(snapshot) = load_snapshot(store, id)? else {
        return Ok(None);
    };
    let health_and_mana_record = match store.get(&Key::HealthAndMana(snapshot.health_and_mana))? {
        Some(Value::HealthAndMana(record)) => Some(record),
        _ => None,
    };
    let skills_record = match store.get(&Key::Skills(snapshot.skills))? {
        Some(Value::Skills(record)) => Some(record),
        _ => None,
    };
    let tactics_record = match store.get(&Key::Tactics(snapshot.tactics))? {
        Some(Value::Tactics(record)) => Some(record),
        _ => None,
    };
    let special_attack_record = match store.get(&Key::SpecialAttack(snapshot.special_attack))? {
        Some(Value::SpecialAttack(record)) => Some(record),
        _ => None,
    };
    let special_defense_record = match store.get(&Key::SpecialDefense(snapshot.special_defense))? {
        Some(Value::SpecialDefense(record)) => Some(record),
        _ => None,
    };
    Ok(Some(SnapshotView {
        snapshot,
        health_and_mana_record,
        skills_record,
        tactics_record,
        special_attack_record,
        special_defense_record,
    }))
}

async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

async fn stats(AxumState(indexer): AxumState<Arc<Indexer>>) -> Response {
    match indexer.stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn get_dragon(
    AxumState(indexer): AxumState<Arc<Indexer>>,
    Path(id): Path<String>,
) -> Response {
    let id: DragonId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    read(&indexer, |store| load_dragon(store, id))
}

async fn get_dragon_stats(
    AxumState(indexer): AxumState<Arc<Indexer>>,
    Path(id): Path<String>,
) -> Response {
    let id: DragonId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    read(&indexer, |store| load_dragon_stat(store, id))
}

async fn get_user_stats(
    AxumState(indexer): AxumState<Arc<Indexer>>,
    Path(address): Path<String>,
) -> Response {
    let address: Address = match parse_id(&address) {
        Ok(address) => address,
        Err(response) => return response,
    };
    read(&indexer, |store| load_user_stat(store, address))
}

async fn get_battle(
    AxumState(indexer): AxumState<Arc<Indexer>>,
    Path(id): Path<String>,
) -> Response {
    let id: BattleId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    read(&indexer, |store| {
        let Some(battle) = load_battle(store, id)? else {
            return Ok(None);
        };
        Ok(Some(BattleView {
            winner_snapshot: snapshot_view(store, battle.winner_dragon_snapshot)?,
            looser_snapshot: snapshot_view(store, battle.looser_dragon_snapshot)?,
            attacker_snapshot: snapshot_view(store, battle.attacker_dragon_snapshot)?,
            defender_snapshot: snapshot_view(store, battle.defender_dragon_snapshot)?,
            battle,
        }))
    })
}

async fn get_snapshot(
    AxumState(indexer): AxumState<Arc<Indexer>>,
    Path(id): Path<String>,
) -> Response {
    let id: SnapshotId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    read(&indexer, |store| snapshot_view(store, id))
}

async fn get_gladiator_battle(
    AxumState(indexer): AxumState<Arc<Indexer>>,
    Path(id): Path<String>,
) -> Response {
    let id: GladiatorBattleId = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    read(&indexer, |store| load_gladiator_battle(store, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::io::Cursor as ReadCursor;
    use tower::ServiceExt;
    use wyvern_execution::mocks;
    use wyvern_types::execution::Event;

    fn indexer_with_battle() -> Arc<Indexer> {
        let indexer = test_support::in_memory();
        {
            let mut store = indexer.store().unwrap();
            mocks::seed_dragon(&mut *store, 7, Some(mocks::create_address(1)));
        }
        let raw = [
            mocks::create_record(1, 0, mocks::battle_ended(42, 7, 9, 7)),
            mocks::create_record(
                1,
                1,
                Event::BattleHealthAndMana {
                    battle_id: BattleId(42),
                    attacker_init_health: 10,
                    attacker_init_mana: 11,
                    attacker_max_health: 12,
                    attacker_max_mana: 13,
                    opponent_init_health: 20,
                    opponent_init_mana: 21,
                    opponent_max_health: 22,
                    opponent_max_mana: 23,
                },
            ),
            mocks::create_record(
                2,
                0,
                Event::GladiatorBattleCreated {
                    id: GladiatorBattleId(5),
                    dragon_id: DragonId(7),
                    bet: 10,
                    is_gold: true,
                },
            ),
        ]
        .iter()
        .map(|record| serde_json::to_string(record).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
        indexer
            .ingest(ReadCursor::new(raw), &mocks::create_chain(&[7, 9]))
            .unwrap();
        Arc::new(indexer)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_healthz() {
        let router = Api::new(Arc::new(test_support::in_memory())).router();
        let (status, body) = get_json(router, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_battle_expands_snapshots() {
        let router = Api::new(indexer_with_battle()).router();
        let (status, body) = get_json(router, "/battles/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["winner_dragon"], 7);
        assert_eq!(body["attacker_dragon_snapshot"], "7-42");
        assert_eq!(body["winner_user"], mocks::create_address(1).to_string());
        assert_eq!(body["attacker_snapshot"]["id"], "7-42");
        assert_eq!(
            body["attacker_snapshot"]["health_and_mana_record"]["init_health"],
            10
        );
        assert_eq!(
            body["defender_snapshot"]["health_and_mana_record"]["init_health"],
            20
        );
        assert!(body["defender_snapshot"]["tactics_record"].is_null());
    }

    #[tokio::test]
    async fn test_dragon_and_stats_routes() {
        let indexer = indexer_with_battle();
        let (status, body) = get_json(Api::new(indexer.clone()).router(), "/dragons/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gladiator_battle"], 5);

        let (status, body) = get_json(Api::new(indexer.clone()).router(), "/dragons/7/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wins"], 1);

        let uri = format!("/users/{}/stats", mocks::create_address(1));
        let (status, body) = get_json(Api::new(indexer.clone()).router(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wins"], 1);

        let (status, body) = get_json(Api::new(indexer.clone()).router(), "/gladiator-battles/5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Created");
        assert_eq!(body["currency"], "Gold");

        let (status, body) = get_json(Api::new(indexer).router(), "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metrics"]["applied"], 3);
        assert_eq!(body["cursor"]["block"], 2);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids() {
        let indexer = indexer_with_battle();
        for (uri, expected) in [
            ("/dragons/9", StatusCode::NOT_FOUND),
            ("/dragons/abc", StatusCode::BAD_REQUEST),
            ("/dragons/9/stats", StatusCode::NOT_FOUND),
            ("/battles/43", StatusCode::NOT_FOUND),
            ("/snapshots/9-42", StatusCode::OK),
            ("/snapshots/9_42", StatusCode::BAD_REQUEST),
            ("/snapshots/9-43", StatusCode::NOT_FOUND),
            ("/users/0x1234/stats", StatusCode::BAD_REQUEST),
            ("/gladiator-battles/6", StatusCode::NOT_FOUND),
        ] {
            let (status, _) = get_json(Api::new(indexer.clone()).router(), uri).await;
            assert_eq!(status, expected, "{uri}");
        }
    }
}
