use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::db::models::{
    BankrollHistorySnapshot, BetCandidate, NewCandidate, WagerRecommendation,
};
use crate::db::Database;
use crate::error::StakingError;
use crate::staking::parlay::{compose_parlays, ParlayDescriptor, ParlayOptions};
use crate::staking::projector::{
    compute_recommendations, update_bankroll, BankrollView, ProjectionResult,
};
use crate::staking::{odds, risk, BankrollStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub days_projection: u32,
    pub max_days_projection: u32,
    pub parlay: ParlayOptions,
}

/// Build the Axum router for the recommendation API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/bankroll", get(get_bankroll_handler).post(update_bankroll_handler))
        .route("/api/bankroll/history", get(history_handler))
        .route("/api/bankroll/recommendations", get(recommendations_handler))
        .route("/api/bankroll/calculate", post(calculate_handler))
        .route("/api/parlays", get(parlays_handler))
        .route("/api/candidates", post(add_candidate_handler))
        .route("/api/candidates/:id/settle", post(settle_candidate_handler))
        .route("/api/odds/convert", post(convert_odds_handler))
        .route("/api/risk-profiles/:label", get(risk_profile_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct BankrollRequest {
    pub user_id: i64,
    pub current_amount: f64,
    pub target_profit: f64,
    pub risk_profile: String,
}

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub user_id: i64,
    pub current_amount: Option<f64>,
    pub target_profit: Option<f64>,
    pub risk_profile: Option<String>,
    pub days_projection: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ParlayQuery {
    pub user_id: i64,
    pub max_legs: Option<usize>,
    pub min_leg_ev: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    /// "won" | "lost"
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub id: i64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OddsRequest {
    pub odds: String,
}

#[derive(Debug, Serialize)]
pub struct OddsResponse {
    pub decimal_odds: f64,
    pub implied_probability: f64,
}

#[derive(Debug, Serialize)]
pub struct RiskProfileResponse {
    pub label: String,
    pub kelly_multiplier: f64,
}

impl AppState {
    fn horizon(&self, requested: Option<u32>) -> Result<u32, StakingError> {
        let days = requested.unwrap_or(self.days_projection);
        if !(1..=self.max_days_projection).contains(&days) {
            return Err(StakingError::validation(
                "days_projection",
                format!("must be between 1 and {}", self.max_days_projection),
            ));
        }
        Ok(days)
    }
}

/// GET /api/bankroll?user_id=1
async fn get_bankroll_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> Result<Json<BankrollView>, StakingError> {
    let bankroll = state
        .db
        .get_bankroll(q.user_id)?
        .ok_or(StakingError::NotFound(q.user_id))?;
    let recommendations =
        compute_recommendations(&state.db, &state.db, q.user_id, state.days_projection, today())?;
    Ok(Json(BankrollView {
        bankroll,
        recommendations,
    }))
}

/// POST /api/bankroll
async fn update_bankroll_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BankrollRequest>,
) -> Result<Json<BankrollView>, StakingError> {
    update_bankroll(
        &state.db,
        &state.db,
        req.user_id,
        req.current_amount,
        req.target_profit,
        &req.risk_profile,
        state.days_projection,
        today(),
    )
    .map(Json)
}

/// GET /api/bankroll/history?user_id=1
async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> Result<Json<Vec<BankrollHistorySnapshot>>, StakingError> {
    let bankroll = state
        .db
        .get_bankroll(q.user_id)?
        .ok_or(StakingError::NotFound(q.user_id))?;
    Ok(Json(state.db.list_history(bankroll.id)?))
}

/// GET /api/bankroll/recommendations?user_id=1
async fn recommendations_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> Result<Json<Vec<WagerRecommendation>>, StakingError> {
    let bankroll = state
        .db
        .get_bankroll(q.user_id)?
        .ok_or(StakingError::NotFound(q.user_id))?;
    Ok(Json(state.db.list_recommendations(bankroll.id, today())?))
}

/// POST /api/bankroll/calculate
///
/// With all of amount, target and risk supplied the bankroll is updated
/// first. Either way the schedule covers the requested horizon, or the
/// configured default when none is given.
async fn calculate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalculateRequest>,
) -> Result<Json<ProjectionResult>, StakingError> {
    let days = state.horizon(req.days_projection)?;
    if let (Some(amount), Some(target), Some(risk)) =
        (req.current_amount, req.target_profit, req.risk_profile.as_deref())
    {
        let view = update_bankroll(
            &state.db,
            &state.db,
            req.user_id,
            amount,
            target,
            risk,
            days,
            today(),
        )?;
        return Ok(Json(view.recommendations));
    }
    compute_recommendations(&state.db, &state.db, req.user_id, days, today()).map(Json)
}

/// GET /api/parlays?user_id=1&max_legs=3&min_leg_ev=0.05
async fn parlays_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ParlayQuery>,
) -> Result<Json<Vec<ParlayDescriptor>>, StakingError> {
    let options = ParlayOptions {
        max_legs: q.max_legs.unwrap_or(state.parlay.max_legs),
        min_leg_ev: q.min_leg_ev.unwrap_or(state.parlay.min_leg_ev),
        ..state.parlay
    };
    compose_parlays(&state.db, &state.db, q.user_id, options).map(Json)
}

/// POST /api/candidates
async fn add_candidate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewCandidate>,
) -> Result<Json<BetCandidate>, StakingError> {
    odds::decimal_profit_multiplier(req.decimal_odds)?;
    if !(req.win_probability > 0.0 && req.win_probability < 1.0) {
        return Err(StakingError::validation(
            "win_probability",
            "must be strictly between 0 and 1",
        ));
    }
    Ok(Json(state.db.add_candidate(&req)?))
}

/// POST /api/candidates/:id/settle
async fn settle_candidate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, StakingError> {
    if !matches!(req.status.as_str(), "won" | "lost") {
        return Err(StakingError::validation("status", "must be 'won' or 'lost'"));
    }
    if !state.db.settle_candidate(id, &req.status)? {
        return Err(StakingError::CandidateNotFound(id));
    }
    Ok(Json(SettleResponse {
        id,
        status: req.status,
    }))
}

/// POST /api/odds/convert
async fn convert_odds_handler(
    Json(req): Json<OddsRequest>,
) -> Result<Json<OddsResponse>, StakingError> {
    let decimal_odds = odds::american_to_decimal(&req.odds)?;
    Ok(Json(OddsResponse {
        decimal_odds,
        implied_probability: odds::implied_probability(decimal_odds)?,
    }))
}

/// GET /api/risk-profiles/:label
async fn risk_profile_handler(
    Path(label): Path<String>,
) -> Result<Json<RiskProfileResponse>, StakingError> {
    let kelly_multiplier = risk::get_factor(&label)?;
    Ok(Json(RiskProfileResponse {
        label,
        kelly_multiplier,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use crate::staking::BetSource;

    fn state() -> Arc<AppState> {
        state_with_horizon(30)
    }

    fn state_with_horizon(days_projection: u32) -> Arc<AppState> {
        Arc::new(AppState {
            db: Database::open(":memory:").unwrap(),
            days_projection,
            max_days_projection: 365,
            parlay: ParlayOptions::default(),
        })
    }

    fn bankroll_request(user_id: i64, amount: f64) -> BankrollRequest {
        BankrollRequest {
            user_id,
            current_amount: amount,
            target_profit: 500.0,
            risk_profile: "medium".into(),
        }
    }

    #[tokio::test]
    async fn test_get_bankroll_not_configured() {
        let err = get_bankroll_handler(State(state()), Query(UserQuery { user_id: 3 }))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_then_read_back() {
        let state = state();
        let Json(created) = update_bankroll_handler(State(state.clone()), Json(bankroll_request(1, 1000.0)))
            .await
            .unwrap();
        assert_eq!(created.recommendations.daily_wagers.len(), 30);
        assert_eq!(created.recommendations.daily_wagers[0].recommended_wager, 50.0);

        let _ = update_bankroll_handler(State(state.clone()), Json(bankroll_request(1, 800.0)))
            .await
            .unwrap();

        let Json(view) = get_bankroll_handler(State(state.clone()), Query(UserQuery { user_id: 1 }))
            .await
            .unwrap();
        assert_eq!(view.bankroll.current_amount, 800.0);

        let Json(history) = history_handler(State(state.clone()), Query(UserQuery { user_id: 1 }))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, 1000.0);

        let Json(stored) = recommendations_handler(State(state), Query(UserQuery { user_id: 1 }))
            .await
            .unwrap();
        assert_eq!(stored.len(), 30);
    }

    #[tokio::test]
    async fn test_configured_horizon_applies_to_every_route() {
        let state = state_with_horizon(10);
        let mut req = bankroll_request(1, 1000.0);
        req.target_profit = 1e6;
        let Json(created) = update_bankroll_handler(State(state.clone()), Json(req))
            .await
            .unwrap();
        assert_eq!(created.recommendations.daily_wagers.len(), 10);

        let Json(view) = get_bankroll_handler(State(state.clone()), Query(UserQuery { user_id: 1 }))
            .await
            .unwrap();
        assert_eq!(view.recommendations.daily_wagers.len(), 10);

        let req = CalculateRequest {
            user_id: 1,
            current_amount: Some(900.0),
            target_profit: Some(1e6),
            risk_profile: Some("low".into()),
            days_projection: None,
        };
        let Json(result) = calculate_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(result.daily_wagers.len(), 10);

        let Json(stored) = recommendations_handler(State(state), Query(UserQuery { user_id: 1 }))
            .await
            .unwrap();
        assert_eq!(stored.len(), 10);
    }

    #[tokio::test]
    async fn test_update_validation_is_bad_request() {
        let mut req = bankroll_request(1, 1000.0);
        req.risk_profile = "extreme".into();
        let err = update_bankroll_handler(State(state()), Json(req)).await.unwrap_err();
        assert!(matches!(err, StakingError::Validation { field: "risk_profile", .. }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_calculate_with_saved_settings_and_horizon() {
        let state = state();
        let _ = update_bankroll_handler(State(state.clone()), Json(bankroll_request(1, 1000.0)))
            .await
            .unwrap();
        let req = CalculateRequest {
            user_id: 1,
            current_amount: None,
            target_profit: None,
            risk_profile: None,
            days_projection: Some(7),
        };
        let Json(result) = calculate_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(result.daily_wagers.len(), 7);

        let req = CalculateRequest {
            user_id: 1,
            current_amount: None,
            target_profit: None,
            risk_profile: None,
            days_projection: Some(1000),
        };
        let err = calculate_handler(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, StakingError::Validation { field: "days_projection", .. }));
    }

    #[tokio::test]
    async fn test_calculate_with_overrides_updates_bankroll() {
        let state = state();
        let req = CalculateRequest {
            user_id: 2,
            current_amount: Some(400.0),
            target_profit: Some(100.0),
            risk_profile: Some("high".into()),
            days_projection: None,
        };
        let Json(result) = calculate_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(result.current_bankroll, 400.0);
        assert!(state.db.get_bankroll(2).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_candidates_feed_parlays() {
        let state = state();
        let _ = update_bankroll_handler(State(state.clone()), Json(bankroll_request(1, 1000.0)))
            .await
            .unwrap();
        for (odds, p) in [(2.0, 0.6), (1.9, 0.6)] {
            let _ = add_candidate_handler(
                State(state.clone()),
                Json(NewCandidate {
                    user_id: 1,
                    decimal_odds: odds,
                    win_probability: p,
                    selection: None,
                }),
            )
            .await
            .unwrap();
        }
        let q = ParlayQuery {
            user_id: 1,
            max_legs: None,
            min_leg_ev: None,
        };
        let Json(parlays) = parlays_handler(State(state), Query(q)).await.unwrap();
        assert_eq!(parlays.len(), 1);
        assert!((parlays[0].recommended_wager - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_add_candidate_rejects_bad_numbers() {
        let state = state();
        let bad_odds = NewCandidate {
            user_id: 1,
            decimal_odds: 1.0,
            win_probability: 0.5,
            selection: None,
        };
        let err = add_candidate_handler(State(state.clone()), Json(bad_odds)).await.unwrap_err();
        assert!(matches!(err, StakingError::InvalidOdds(_)));

        let bad_prob = NewCandidate {
            user_id: 1,
            decimal_odds: 2.0,
            win_probability: 1.2,
            selection: None,
        };
        let err = add_candidate_handler(State(state), Json(bad_prob)).await.unwrap_err();
        assert!(matches!(err, StakingError::Validation { field: "win_probability", .. }));
    }

    #[tokio::test]
    async fn test_settled_candidate_leaves_feed() {
        let state = state();
        let Json(candidate) = add_candidate_handler(
            State(state.clone()),
            Json(NewCandidate {
                user_id: 1,
                decimal_odds: 2.2,
                win_probability: 0.5,
                selection: Some("Away +1.5".into()),
            }),
        )
        .await
        .unwrap();

        let err = settle_candidate_handler(
            State(state.clone()),
            Path(candidate.id),
            Json(SettleRequest { status: "void".into() }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StakingError::Validation { field: "status", .. }));

        let Json(settled) = settle_candidate_handler(
            State(state.clone()),
            Path(candidate.id),
            Json(SettleRequest { status: "won".into() }),
        )
        .await
        .unwrap();
        assert_eq!(settled.status, "won");
        assert!(state.db.pending_candidates().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settle_unknown_candidate_is_not_found() {
        let err = settle_candidate_handler(
            State(state()),
            Path(404),
            Json(SettleRequest { status: "lost".into() }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StakingError::CandidateNotFound(404)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_odds_and_risk_lookups() {
        let Json(resp) = convert_odds_handler(Json(OddsRequest { odds: "+300".into() }))
            .await
            .unwrap();
        assert_eq!(resp.decimal_odds, 4.0);
        assert_eq!(resp.implied_probability, 0.25);

        let Json(resp) = risk_profile_handler(Path("low".into())).await.unwrap();
        assert_eq!(resp.kelly_multiplier, 0.25);
        let err = risk_profile_handler(Path("max".into())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
