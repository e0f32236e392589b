//! HTTP surface for the moderation engine, plus the Prometheus `/metrics`
//! endpoint.
//!
//! The acting principal comes from headers set by the upstream gateway:
//! `x-actor-id`, `x-actor-role` (`member|moderator|admin`) and, for
//! moderators, `x-actor-community`. Errors are JSON `{ "kind", "message" }`.

use crate::caps::{Principal, Role};
use crate::db::Database;
use crate::error::{ModerationError, ModerationResult};
use crate::moderation::{
    ActionRequest, AppealRequest, BanRequest, Engine, ReportRequest, ResolutionRequest,
    SuspensionRequest,
};
use axum::{
    Json, Router, async_trait,
    extract::{FromRequestParts, Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use sanction_proto::{
    ActionType, AppealType, ContentKind, Decision, PenaltyModification, ReportStatus, SanctionRef,
    TargetRef, Tier, ViolationCategory,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::Instrument;
use uuid::Uuid;

const ACTOR_ID: &str = "x-actor-id";
const ACTOR_ROLE: &str = "x-actor-role";
const ACTOR_COMMUNITY: &str = "x-actor-community";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine<Database>>,
}

/// Build the router.
pub fn router(engine: Arc<Engine<Database>>) -> Router {
    Router::new()
        .route("/reports", post(submit_report))
        .route("/reports/:id", get(get_report))
        .route("/reports/:id/triage", post(triage_report))
        .route("/actions", post(apply_action))
        .route("/bans", post(apply_ban))
        .route("/suspensions", post(apply_suspension))
        .route("/sanctions/:kind/:id", get(get_sanction))
        .route("/sanctions/:kind/:id/appeals", get(sanction_appeals))
        .route("/content/:kind/:id", put(register_content))
        .route("/content/:kind/:id/state", get(content_state))
        .route("/members/:id/standing", get(member_standing))
        .route("/appeals", post(submit_appeal))
        .route("/appeals/:id", get(get_appeal))
        .route("/appeals/:id/review", post(begin_review))
        .route("/appeals/:id/escalate", post(escalate_appeal))
        .route("/appeals/:id/resolve", post(resolve_appeal))
        .route("/audit/:kind/:id", get(audit_trail))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(request_span))
        .with_state(AppState { engine })
}

/// Serve on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, engine: Arc<Engine<Database>>) -> std::io::Result<()> {
    axum::serve(listener, router(engine)).await
}

/// Bind `addr` and serve. Long-running; spawn it or await it last.
pub async fn run_http_server(addr: SocketAddr, engine: Arc<Engine<Database>>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");
    serve(listener, engine).await
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

async fn request_span(request: Request, next: Next) -> Response {
    let actor = request
        .headers()
        .get(ACTOR_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let span = crate::telemetry::spans::request(
        request.method().as_str(),
        request.uri().path(),
        actor.as_deref(),
    );
    next.run(request).instrument(span).await
}

// ============================================================================
// Principal extraction
// ============================================================================

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ModerationError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers)
    }
}

fn principal_from_headers(headers: &HeaderMap) -> ModerationResult<Principal> {
    let id = header_uuid(headers, ACTOR_ID)?
        .ok_or_else(|| ModerationError::forbidden(format!("missing {ACTOR_ID} header")))?;
    let role = header_str(headers, ACTOR_ROLE)
        .ok_or_else(|| ModerationError::forbidden(format!("missing {ACTOR_ROLE} header")))?
        .parse::<Role>()
        .map_err(ModerationError::forbidden)?;

    Ok(match role {
        Role::Member => Principal::Member { id },
        Role::Admin => Principal::Admin { id },
        Role::Moderator => {
            let community_id = header_uuid(headers, ACTOR_COMMUNITY)?.ok_or_else(|| {
                ModerationError::forbidden(format!("moderators must send {ACTOR_COMMUNITY}"))
            })?;
            Principal::Moderator { id, community_id }
        }
    })
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_uuid(headers: &HeaderMap, name: &str) -> ModerationResult<Option<Uuid>> {
    header_str(headers, name)
        .map(|v| {
            v.parse::<Uuid>()
                .map_err(|_| ModerationError::forbidden(format!("{name} is not a UUID")))
        })
        .transpose()
}

// ============================================================================
// Decoding helpers
// ============================================================================

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ModerationResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ModerationError::validation(rejection.body_text()))
}

fn parse_uuid(field: &str, raw: &str) -> ModerationResult<Uuid> {
    raw.parse()
        .map_err(|_| ModerationError::validation(format!("{field} is not a UUID")))
}

fn target_path(kind: &str, id: &str) -> ModerationResult<TargetRef> {
    let kind: ContentKind = kind.parse()?;
    Ok(TargetRef::new(kind, parse_uuid("id", id)?))
}

fn sanction_path(kind: &str, id: &str) -> ModerationResult<SanctionRef> {
    let id = parse_uuid("id", id)?;
    match kind {
        "moderation_action" => Ok(SanctionRef::ModerationAction(id)),
        "community_ban" => Ok(SanctionRef::CommunityBan(id)),
        "platform_suspension" => Ok(SanctionRef::PlatformSuspension(id)),
        other => Err(ModerationError::validation(format!(
            "unknown sanction kind {other:?}"
        ))),
    }
}

/// The four optional target fields a client sends.
#[derive(Debug, Deserialize)]
struct TargetFields {
    topic_id: Option<Uuid>,
    reply_id: Option<Uuid>,
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
}

impl TargetFields {
    fn target(&self) -> ModerationResult<TargetRef> {
        Ok(TargetRef::from_fields(
            self.topic_id,
            self.reply_id,
            self.post_id,
            self.comment_id,
        )?)
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Deserialize)]
struct SubmitReportBody {
    #[serde(flatten)]
    target: TargetFields,
    violation_category: ViolationCategory,
    explanation: Option<String>,
}

async fn submit_report(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<SubmitReportBody>, JsonRejection>,
) -> ModerationResult<(StatusCode, Json<sanction_proto::Report>)> {
    let body = json_body(payload)?;
    let request = ReportRequest {
        target: body.target.target()?,
        violation_category: body.violation_category,
        explanation: body.explanation,
    };
    let report = state.engine.intake().submit(principal.id(), request).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn get_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ModerationResult<Json<sanction_proto::Report>> {
    let id = parse_uuid("report id", &id)?;
    Ok(Json(state.engine.intake().get(&principal, id).await?))
}

#[derive(Debug, Deserialize)]
struct TriageBody {
    status: ReportStatus,
}

async fn triage_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Result<Json<TriageBody>, JsonRejection>,
) -> ModerationResult<Json<sanction_proto::Report>> {
    let id = parse_uuid("report id", &id)?;
    let body = json_body(payload)?;
    let report = state
        .engine
        .authority()
        .triage_report(&principal, id, body.status)
        .await?;
    Ok(Json(report))
}

// ============================================================================
// Sanctions
// ============================================================================

fn default_action_type() -> ActionType {
    ActionType::Remove
}

#[derive(Debug, Deserialize)]
struct ApplyActionBody {
    #[serde(flatten)]
    target: TargetFields,
    #[serde(default = "default_action_type")]
    action_type: ActionType,
    scope: Tier,
    reason_category: ViolationCategory,
    reason_text: String,
    internal_notes: Option<String>,
    report_id: Option<Uuid>,
    report_status: Option<ReportStatus>,
}

async fn apply_action(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<ApplyActionBody>, JsonRejection>,
) -> ModerationResult<(StatusCode, Json<sanction_proto::ModerationAction>)> {
    let body = json_body(payload)?;
    let request = ActionRequest {
        target: body.target.target()?,
        action_type: body.action_type,
        scope: body.scope,
        reason_category: body.reason_category,
        reason_text: body.reason_text,
        internal_notes: body.internal_notes,
        report_id: body.report_id,
        report_status: body.report_status,
    };
    let action = state.engine.authority().apply_action(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

#[derive(Debug, Deserialize)]
struct ApplyBanBody {
    community_id: Uuid,
    user_id: Uuid,
    reason_category: ViolationCategory,
    reason_text: String,
    #[serde(default)]
    is_permanent: bool,
    expiration_date: Option<DateTime<Utc>>,
}

async fn apply_ban(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<ApplyBanBody>, JsonRejection>,
) -> ModerationResult<(StatusCode, Json<sanction_proto::CommunityBan>)> {
    let body = json_body(payload)?;
    let request = BanRequest {
        community_id: body.community_id,
        user_id: body.user_id,
        reason_category: body.reason_category,
        reason_text: body.reason_text,
        is_permanent: body.is_permanent,
        expiration_date: body.expiration_date,
    };
    let ban = state.engine.authority().apply_ban(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(ban)))
}

#[derive(Debug, Deserialize)]
struct ApplySuspensionBody {
    user_id: Uuid,
    reason_category: ViolationCategory,
    reason_text: String,
    #[serde(default)]
    is_permanent: bool,
    expiration_date: Option<DateTime<Utc>>,
}

async fn apply_suspension(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<ApplySuspensionBody>, JsonRejection>,
) -> ModerationResult<(StatusCode, Json<sanction_proto::PlatformSuspension>)> {
    let body = json_body(payload)?;
    let request = SuspensionRequest {
        user_id: body.user_id,
        reason_category: body.reason_category,
        reason_text: body.reason_text,
        is_permanent: body.is_permanent,
        expiration_date: body.expiration_date,
    };
    let suspension = state
        .engine
        .authority()
        .apply_suspension(&principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(suspension)))
}

async fn get_sanction(
    State(state): State<AppState>,
    principal: Principal,
    Path((kind, id)): Path<(String, String)>,
) -> ModerationResult<Json<sanction_proto::Sanction>> {
    let reference = sanction_path(&kind, &id)?;
    Ok(Json(
        state.engine.authority().sanction(&principal, reference).await?,
    ))
}

async fn sanction_appeals(
    State(state): State<AppState>,
    principal: Principal,
    Path((kind, id)): Path<(String, String)>,
) -> ModerationResult<Json<Vec<sanction_proto::Appeal>>> {
    let reference = sanction_path(&kind, &id)?;
    Ok(Json(
        state.engine.appeals().history(&principal, reference).await?,
    ))
}

// ============================================================================
// Content and members
// ============================================================================

#[derive(Debug, Deserialize)]
struct RegisterContentBody {
    author_id: Uuid,
    community_id: Uuid,
}

/// Sync one content item from the host application. Admins only.
async fn register_content(
    State(state): State<AppState>,
    principal: Principal,
    Path((kind, id)): Path<(String, String)>,
    payload: Result<Json<RegisterContentBody>, JsonRejection>,
) -> ModerationResult<StatusCode> {
    if !matches!(principal, Principal::Admin { .. }) {
        return Err(ModerationError::forbidden(
            "content registration is restricted to admins",
        ));
    }
    let target = target_path(&kind, &id)?;
    let body = json_body(payload)?;
    state
        .engine
        .store()
        .content()
        .upsert(target, body.author_id, body.community_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn content_state(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> ModerationResult<Json<crate::moderation::ContentState>> {
    let target = target_path(&kind, &id)?;
    Ok(Json(state.engine.authority().content_state(target).await?))
}

#[derive(Debug, Deserialize)]
struct StandingQuery {
    community_id: Option<Uuid>,
}

async fn member_standing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Query(query): Query<StandingQuery>,
) -> ModerationResult<Json<crate::moderation::MemberStanding>> {
    let member_id = parse_uuid("member id", &id)?;
    if matches!(principal, Principal::Member { .. }) && principal.id() != member_id {
        return Err(ModerationError::forbidden(
            "members may only view their own standing",
        ));
    }
    Ok(Json(
        state
            .engine
            .authority()
            .member_standing(member_id, query.community_id)
            .await?,
    ))
}

// ============================================================================
// Appeals
// ============================================================================

#[derive(Debug, Deserialize)]
struct SubmitAppealBody {
    moderation_action_id: Option<Uuid>,
    community_ban_id: Option<Uuid>,
    platform_suspension_id: Option<Uuid>,
    appeal_type: AppealType,
    appeal_text: String,
}

async fn submit_appeal(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<SubmitAppealBody>, JsonRejection>,
) -> ModerationResult<(StatusCode, Json<sanction_proto::Appeal>)> {
    let body = json_body(payload)?;
    let request = AppealRequest {
        sanction: SanctionRef::from_fields(
            body.moderation_action_id,
            body.community_ban_id,
            body.platform_suspension_id,
        )?,
        appeal_type: body.appeal_type,
        appeal_text: body.appeal_text,
    };
    let appeal = state.engine.appeals().submit(principal.id(), request).await?;
    Ok((StatusCode::CREATED, Json(appeal)))
}

async fn get_appeal(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ModerationResult<Json<sanction_proto::Appeal>> {
    let id = parse_uuid("appeal id", &id)?;
    Ok(Json(state.engine.appeals().get(&principal, id).await?))
}

async fn begin_review(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ModerationResult<Json<sanction_proto::Appeal>> {
    let id = parse_uuid("appeal id", &id)?;
    Ok(Json(state.engine.appeals().begin_review(&principal, id).await?))
}

#[derive(Debug, Default, Deserialize)]
struct EscalateBody {
    reason: Option<String>,
}

async fn escalate_appeal(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Option<Json<EscalateBody>>,
) -> ModerationResult<Json<sanction_proto::Appeal>> {
    let id = parse_uuid("appeal id", &id)?;
    let reason = payload.and_then(|Json(body)| body.reason);
    Ok(Json(
        state.engine.appeals().escalate(&principal, id, reason).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct ResolveBody {
    decision: Decision,
    #[serde(default)]
    decision_explanation: String,
    penalty_modification: Option<PenaltyModification>,
}

async fn resolve_appeal(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Result<Json<ResolveBody>, JsonRejection>,
) -> ModerationResult<Json<sanction_proto::Appeal>> {
    let id = parse_uuid("appeal id", &id)?;
    let body = json_body(payload)?;
    let request = ResolutionRequest {
        decision: body.decision,
        decision_explanation: body.decision_explanation,
        penalty_modification: body.penalty_modification,
    };
    let outcome = state.engine.resolution().resolve(&principal, id, request).await?;
    Ok(Json(outcome.appeal))
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Serialize)]
struct AuditEntryBody {
    at: DateTime<Utc>,
    actor_id: Uuid,
    action: String,
    detail: Option<String>,
}

async fn audit_trail(
    State(state): State<AppState>,
    principal: Principal,
    Path((kind, id)): Path<(String, String)>,
) -> ModerationResult<Json<Vec<AuditEntryBody>>> {
    let id = parse_uuid("id", &id)?;
    let entries = state.engine.audit_trail(&principal, &kind, id).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|e| AuditEntryBody {
                at: e.at,
                actor_id: e.actor_id,
                action: e.action,
                detail: e.detail,
            })
            .collect(),
    ))
}
