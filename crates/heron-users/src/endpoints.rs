//! The user endpoints.
//!
//! | Path               | Verb | Middleware                  |
//! |--------------------|------|-----------------------------|
//! | `/api/register`    | POST | `db:ready`                  |
//! | `/api/whoAmI`      | GET  | `db:ready`, `auth:validToken` |
//! | `/api/getUserInfo` | GET  | `db:ready`, `auth:validToken` |

use std::sync::Arc;
use std::time::Instant;

use heron::core::{
    DocMeta, HeronResult, ObjectSchema, RegisterType, ResponseDoc, Rule, Schema, StringRule, User,
    Validation,
};
use heron::middleware::{BoxFuture, Response, ResponseExt};
use heron::server::{EndpointDeclaration, Handler, RequestContext};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::service::UserService;

/// Path of the registration endpoint.
pub const REGISTER_PATH: &str = "/api/register";
/// Path of the current-user endpoint.
pub const WHO_AM_I_PATH: &str = "/api/whoAmI";
/// Path of the user lookup endpoint.
pub const USER_INFO_PATH: &str = "/api/getUserInfo";

const USER_TAG: &str = "User";

/// Every endpoint of the service.
#[must_use]
pub fn all(service: Arc<UserService>) -> Vec<EndpointDeclaration> {
    vec![register(service), who_am_i(), get_user_info()]
}

/// `POST /api/register`.
#[must_use]
pub fn register(service: Arc<UserService>) -> EndpointDeclaration {
    let body = ObjectSchema::new()
        .field(
            "registerType",
            StringRule::new()
                .one_of(["apple", "google"])
                .message(r#"Invalid registerType, must be "apple" or "google""#),
        )
        .field("accessToken", Schema::string());

    EndpointDeclaration::new(REGISTER_PATH)
        .middleware("db:ready")
        .validation(Validation::new().body(body))
        .doc(
            DocMeta::new("Register the user")
                .tag(USER_TAG)
                .response(
                    StatusCode::OK,
                    ResponseDoc::json(
                        ObjectSchema::new()
                            .field("token", Schema::string())
                            .field("type", Schema::string()),
                    ),
                )
                .response(StatusCode::BAD_REQUEST, message_doc())
                .response(StatusCode::BAD_GATEWAY, message_doc()),
        )
        .post(Register { service })
}

/// `GET /api/whoAmI`.
#[must_use]
pub fn who_am_i() -> EndpointDeclaration {
    EndpointDeclaration::new(WHO_AM_I_PATH)
        .middleware("db:ready")
        .middleware("auth:validToken")
        .doc(
            DocMeta::new("Profile of the authenticated user")
                .tag(USER_TAG)
                .response(StatusCode::OK, ResponseDoc::json(Schema::Any))
                .response(StatusCode::UNAUTHORIZED, message_doc()),
        )
        .get(WhoAmI)
}

/// `GET /api/getUserInfo?userId=<uid>`.
#[must_use]
pub fn get_user_info() -> EndpointDeclaration {
    EndpointDeclaration::new(USER_INFO_PATH)
        .middleware("db:ready")
        .middleware("auth:validToken")
        .validation(Validation::new().query("userId", Rule::user_id()))
        .doc(
            DocMeta::new("Profile of another user")
                .tag(USER_TAG)
                .response(StatusCode::OK, ResponseDoc::json(Schema::Any))
                .response(StatusCode::BAD_REQUEST, ResponseDoc::json(errors_schema()))
                .response(StatusCode::UNAUTHORIZED, message_doc()),
        )
        .get(GetUserInfo)
}

fn message_doc() -> ResponseDoc {
    ResponseDoc::json(ObjectSchema::new().field("message", Schema::string()))
}

fn errors_schema() -> Schema {
    ObjectSchema::new()
        .field(
            "errors",
            Schema::array(ObjectSchema::new().field("message", Schema::string())),
        )
        .into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    register_type: RegisterType,
    access_token: String,
}

struct Register {
    service: Arc<UserService>,
}

impl Handler for Register {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>> {
        Box::pin(async move {
            let body: RegisterBody = ctx.body_as()?;
            let provider = body.register_type.as_str();

            let started = Instant::now();
            let resolved = self
                .service
                .provider(body.register_type)
                .resolve(&body.access_token)
                .await;
            ctx.annotate(format!(
                "identity:{provider} - duration: {}ms",
                started.elapsed().as_millis()
            ));

            let profile = match resolved {
                Ok(profile) => profile,
                Err(e) => {
                    return Ok(Response::json(
                        e.status_code(),
                        &json!({ "message": e.message() }),
                    ));
                }
            };

            let registration = self.service.register(body.register_type, profile).await?;
            Ok(Response::json(
                StatusCode::OK,
                &json!({ "token": registration.token, "type": registration.kind }),
            ))
        })
    }
}

struct WhoAmI;

impl Handler for WhoAmI {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>> {
        Box::pin(async move {
            let user = ctx.require_user()?;
            Ok(Response::json(StatusCode::OK, &user.profile()))
        })
    }
}

struct GetUserInfo;

impl Handler for GetUserInfo {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HeronResult<Response>> {
        Box::pin(async move {
            let target: User = ctx.query_as("userId")?;
            Ok(Response::json(StatusCode::OK, &target.profile()))
        })
    }
}
