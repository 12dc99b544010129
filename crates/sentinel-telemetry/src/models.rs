//! Typed display models projected from raw payloads.
//!
//! The API promises nothing beyond "valid JSON". Every accessor here
//! treats a missing or mistyped field as unknown and degrades to zero,
//! an empty string or an empty list; projection never fails.

use serde_json::Value;

use crate::Payload;

fn path<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(root, |node, key| node.get(*key))
}

fn as_u64(v: Option<&Value>) -> u64 {
    match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn as_f64(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Render scalars as text; ids arrive as either numbers or strings.
fn as_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn items<'a>(v: Option<&'a Value>) -> &'a [Value] {
    match v {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

fn list<T>(v: Option<&Value>, f: impl Fn(&Value) -> T) -> Vec<T> {
    items(v).iter().map(f).collect()
}

// ---------------------------------------------------------------------------
// Dashboard overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScorePoint {
    pub time: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RiskUser {
    pub username: String,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Offense {
    pub id: String,
    pub user: String,
    pub title: String,
    pub risk_score: f64,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogLine {
    pub id: String,
    pub timestamp: String,
    pub source: String,
    pub category: String,
    pub event_type: String,
    pub entity_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Anomaly {
    pub id: String,
    pub timestamp: String,
    pub entity_id: String,
    pub risk_score: f64,
    pub title: String,
    pub status: String,
}

/// Projection of the dashboard stats endpoint, shared by the overview,
/// logs, risk, analytics and events panels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardStats {
    pub monitored_users: u64,
    pub high_risk_users: u64,
    pub events_last_hour: u64,
    pub offenses_last_hour: u64,
    pub by_category: Vec<NamedCount>,
    pub system_score: Vec<ScorePoint>,
    pub threat_types: Vec<NamedCount>,
    pub risky_users: Vec<RiskUser>,
    pub recent_offenses: Vec<Offense>,
    pub live_logs: Vec<LogLine>,
    pub anomalies: Vec<Anomaly>,
}

impl DashboardStats {
    pub fn from_payload(payload: &Payload) -> Self {
        let root = payload.value();
        let stats = |key: &str| path(root, &["stats", key]);

        let mut by_category: Vec<NamedCount> = match stats("by_category") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, count)| NamedCount {
                    name: name.clone(),
                    count: as_u64(Some(count)),
                })
                .collect(),
            _ => Vec::new(),
        };
        by_category.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            monitored_users: as_u64(stats("monitored_users")),
            high_risk_users: as_u64(stats("high_risk_users")),
            events_last_hour: as_u64(stats("events_last_hour")),
            offenses_last_hour: as_u64(stats("offenses_last_hour")),
            by_category,
            system_score: list(path(root, &["charts", "system_score"]), |p| ScorePoint {
                time: as_text(p.get("time")),
                score: as_f64(p.get("score")),
            }),
            threat_types: list(path(root, &["charts", "threat_types"]), |t| NamedCount {
                name: as_text(t.get("name")),
                count: as_u64(t.get("count")),
            }),
            risky_users: list(path(root, &["lists", "high_risk_users"]), |u| RiskUser {
                username: as_text(u.get("username")),
                score: as_u64(u.get("score")),
            }),
            recent_offenses: list(path(root, &["lists", "recent_offenses"]), |o| Offense {
                id: as_text(o.get("id")),
                user: as_text(o.get("user")),
                title: as_text(o.get("title")),
                risk_score: as_f64(o.get("risk_score")),
                time: as_text(o.get("time")),
            }),
            live_logs: list(path(root, &["lists", "live_logs"]), |l| LogLine {
                id: as_text(l.get("id")),
                timestamp: as_text(l.get("timestamp")),
                source: as_text(l.get("source")),
                category: as_text(l.get("category")),
                event_type: as_text(l.get("event_type")),
                entity_id: as_text(l.get("entity_id")),
                status: as_text(l.get("status")),
            }),
            anomalies: list(path(root, &["lists", "anomalies"]), |a| Anomaly {
                id: as_text(a.get("id")),
                timestamp: as_text(a.get("timestamp")),
                entity_id: as_text(a.get("entity_id")),
                risk_score: as_f64(a.get("risk_score")),
                title: as_text(a.get("title")),
                status: as_text(a.get("status")),
            }),
        }
    }

    /// Latest point of the system score series, if any.
    pub fn current_score(&self) -> Option<f64> {
        self.system_score.last().map(|p| p.score)
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrafficPoint {
    pub time: String,
    pub inbound_mb: f64,
    pub outbound_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetworkStats {
    pub traffic: Vec<TrafficPoint>,
    pub top_ports: Vec<NamedCount>,
}

impl NetworkStats {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            traffic: list(payload.get("traffic_data"), |p| TrafficPoint {
                time: as_text(p.get("time")),
                inbound_mb: as_f64(p.get("inbound")),
                outbound_mb: as_f64(p.get("outbound")),
            }),
            top_ports: list(payload.get("top_ports"), |p| NamedCount {
                name: as_text(p.get("name")),
                count: as_u64(p.get("count")),
            }),
        }
    }

    pub fn total_inbound_mb(&self) -> f64 {
        self.traffic.iter().map(|p| p.inbound_mb).sum()
    }

    pub fn total_outbound_mb(&self) -> f64 {
        self.traffic.iter().map(|p| p.outbound_mb).sum()
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestPoint {
    pub time: String,
    pub requests: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppAlert {
    pub id: String,
    pub title: String,
    pub risk: f64,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppStats {
    pub requests: Vec<RequestPoint>,
    pub top_users: Vec<NamedCount>,
    pub error_rate: f64,
    pub total_requests: u64,
    pub alerts: Vec<AppAlert>,
}

impl AppStats {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            requests: list(payload.get("request_data"), |p| RequestPoint {
                time: as_text(p.get("time")),
                requests: as_u64(p.get("requests")),
            }),
            top_users: list(payload.get("top_users"), |u| NamedCount {
                name: as_text(u.get("name")),
                count: as_u64(u.get("requests")),
            }),
            error_rate: as_f64(payload.get("error_rate")),
            total_requests: as_u64(payload.get("total_requests")),
            alerts: list(payload.get("app_alerts"), |a| AppAlert {
                id: as_text(a.get("id")),
                title: as_text(a.get("title")),
                risk: as_f64(a.get("risk")),
                time: as_text(a.get("time")),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Hardware
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TempPoint {
    pub time: String,
    pub temp: f64,
}

/// Health of one rack as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RackStatus {
    Optimal,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl RackStatus {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "optimal" => Self::Optimal,
            "warning" => Self::Warning,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rack {
    pub id: String,
    pub status: RackStatus,
    pub load: f64,
    pub temp: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HardwareStats {
    pub temps: Vec<TempPoint>,
    pub racks: Vec<Rack>,
}

impl HardwareStats {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            temps: list(payload.get("temp_data"), |p| TempPoint {
                time: as_text(p.get("time")),
                temp: as_f64(p.get("temp")),
            }),
            racks: list(payload.get("racks"), |r| Rack {
                id: as_text(r.get("id")),
                status: RackStatus::parse(&as_text(r.get("status"))),
                load: as_f64(r.get("load")),
                temp: as_f64(r.get("temp")),
            }),
        }
    }

    pub fn critical_racks(&self) -> usize {
        self.racks
            .iter()
            .filter(|r| r.status == RackStatus::Critical)
            .count()
    }
}
