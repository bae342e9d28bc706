#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use fleet_register::{
    AuthNMode, AuthnConfig, ConnectOpts, FleetRegister, FleetRegisterConfig, NewParty, Party,
    TokenMapping, connect_db,
};
use fleet_security::{Role, RoleSet};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN: &str = "t-admin";
pub const CLIENT: &str = "t-client";
pub const CLIENT_B: &str = "t-client-b";
pub const SERVICE: &str = "t-service";
/// Maps to a username no party holds.
pub const GHOST: &str = "t-ghost";

pub struct Harness {
    pub router: Router,
    pub register: FleetRegister,
    pub client: Party,
    pub client_b: Party,
    pub service: Party,
}

pub struct Reply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Value,
}

async fn party(register: &FleetRegister, username: &str, roles: &[Role], staff: bool) -> Party {
    register
        .bootstrap_party(NewParty {
            username: username.to_owned(),
            display_name: username.to_owned(),
            is_staff: staff,
            roles: roles.iter().copied().collect::<RoleSet>(),
        })
        .await
        .unwrap()
}

pub async fn harness() -> Harness {
    let opts = ConnectOpts {
        max_conns: Some(1),
        min_conns: Some(1),
        ..Default::default()
    };
    let db = connect_db("sqlite::memory:", opts).await.unwrap();
    let register = FleetRegister::new(db, FleetRegisterConfig::default());
    register.migrate().await.unwrap();

    party(&register, "admin", &[Role::Manager], true).await;
    let client = party(&register, "client-a", &[Role::Client], false).await;
    let client_b = party(&register, "client-b", &[Role::Client], false).await;
    let service = party(&register, "service-a", &[Role::Service], false).await;

    let tokens = [
        (ADMIN, "admin"),
        (CLIENT, "client-a"),
        (CLIENT_B, "client-b"),
        (SERVICE, "service-a"),
        (GHOST, "nobody"),
    ]
    .into_iter()
    .map(|(token, username)| TokenMapping {
        token: token.to_owned(),
        username: username.to_owned(),
    })
    .collect();
    let router = register
        .router(AuthnConfig {
            mode: AuthNMode::StaticTokens,
            default_username: String::new(),
            tokens,
        })
        .unwrap();

    Harness {
        router,
        register,
        client,
        client_b,
        service,
    }
}

impl Harness {
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        self.call_as(method, uri, token, None, body).await
    }

    pub async fn call_as(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        role_hint: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(hint) = role_hint {
            builder = builder.header("X-Active-Role", hint);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_owned());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            content_type,
            body,
        }
    }

    /// Create a machine as the manager and return its JSON.
    pub async fn machine(&self, serial: &str, client: &Party, service: &Party) -> Value {
        let reply = self
            .call(
                Method::POST,
                "/fleet-register/v1/machines",
                Some(ADMIN),
                Some(machine_body(serial, client, service)),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body
    }
}

pub fn machine_body(serial: &str, client: &Party, service: &Party) -> Value {
    json!({
        "serial_number": serial,
        "model_technique": { "name": "PD-1" },
        "model_engine": { "name": "D-245" },
        "serial_engine": format!("E-{serial}"),
        "model_transmission": { "name": "T-10" },
        "serial_transmission": format!("T-{serial}"),
        "model_drive_bridge": { "name": "DB-1" },
        "serial_drive_bridge": format!("DB-{serial}"),
        "model_steer_bridge": { "name": "SB-1" },
        "serial_steer_bridge": format!("SB-{serial}"),
        "contract_number": "C-1",
        "shipment_date": "2024-03-01",
        "consignee": "Consignee",
        "delivery_address": "Address",
        "equipment": "Standard",
        "client_id": client.id,
        "service_company_id": service.id,
    })
}

pub fn complaint_body(failure_date: &str, recovery_date: Option<&str>) -> Value {
    json!({
        "failure_date": failure_date,
        "operating_hours": 120,
        "failure_node": { "name": "Engine" },
        "failure_description": "Does not start",
        "recovery_method": { "name": "Repair" },
        "recovery_date": recovery_date,
    })
}

pub fn maintenance_body(performed_date: &str) -> Value {
    json!({
        "kind": { "name": "TO-1" },
        "performed_date": performed_date,
        "operating_hours": 50,
        "work_order_number": "WO-1",
        "organization": { "name": "Self-service" },
    })
}
