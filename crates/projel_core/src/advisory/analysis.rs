//! Proposal analysis contract and the local rule-based analyzer.

use crate::model::load::{Load, LoadKind};
use crate::model::location::LocationId;
use crate::model::zone::{Zone, ZoneId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const EMPTY_SELECTION_ALERT: &str = "Uma Proposta de Circuito deve conter pelo menos uma Carga.";
const LIGHTING_WITH_OUTLETS_ALERT: &str = "Atenção (NBR 5410): Recomenda-se circuitos independentes \
para iluminação e tomadas (exceções aplicam-se a locais específicos).";
const SHARED_DEDICATED_ALERT: &str = "Atenção (NBR 5410): Equipamentos de Uso Específico (TUE) com \
corrente nominal superior a 10A devem, por norma, ter circuitos exclusivos e independentes.";
const UNKNOWN_ZONE_NAME: &str = "Desconhecida";

/// Selected loads plus the project's zones, as sent to the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "cargas_selecionadas")]
    pub loads: Vec<Load>,
    #[serde(rename = "zonas_do_projeto")]
    pub zones: Vec<Zone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(rename = "potencia_total_va")]
    pub total_va: f64,
    #[serde(rename = "potencia_total_w")]
    pub total_w: f64,
    #[serde(rename = "locais_envolvidos_ids")]
    pub location_ids: Vec<LocationId>,
    #[serde(rename = "zonas_envolvidas_ids")]
    pub zone_ids: Vec<ZoneId>,
    #[serde(rename = "alertas_normativos")]
    pub alerts: Vec<String>,
    #[serde(rename = "is_valida")]
    pub is_valid: bool,
}

/// Analysis service failure. The proposal it concerned stays untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Service could not be reached.
    Unreachable(String),
    /// Service answered with a non-success status.
    Rejected { status: u16, message: String },
    /// Service answered with an unreadable payload.
    InvalidResponse(String),
}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(message) => write!(f, "analysis service unreachable: {message}"),
            Self::Rejected { status, message } => {
                write!(f, "analysis service rejected request ({status}): {message}")
            }
            Self::InvalidResponse(message) => {
                write!(f, "analysis service returned invalid response: {message}")
            }
        }
    }
}

impl Error for AnalysisError {}

impl From<serde_json::Error> for AnalysisError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidResponse(value.to_string())
    }
}

/// External proposal-analysis service.
pub trait ProposalAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError>;
}

/// In-process analyzer applying the grouping recommendations locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAnalyzer;

impl ProposalAnalyzer for RuleBasedAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        Ok(analyze_grouping(request))
    }
}

/// Sums the selection and raises the grouping alerts.
///
/// An empty selection yields an invalid report with a single alert.
pub fn analyze_grouping(request: &AnalysisRequest) -> AnalysisReport {
    let loads = &request.loads;
    if loads.is_empty() {
        return AnalysisReport {
            total_va: 0.0,
            total_w: 0.0,
            location_ids: Vec::new(),
            zone_ids: Vec::new(),
            alerts: vec![EMPTY_SELECTION_ALERT.to_string()],
            is_valid: false,
        };
    }

    let mut total_va = 0.0;
    let mut total_w = 0.0;
    let mut location_ids = Vec::new();
    let mut zone_ids = Vec::new();
    for load in loads {
        total_va += load.apparent_power_va();
        total_w += load.active_power_w();
        if !location_ids.contains(&load.location_id) {
            location_ids.push(load.location_id);
        }
        if let Some(zone_id) = load.zone_id {
            if !zone_ids.contains(&zone_id) {
                zone_ids.push(zone_id);
            }
        }
    }

    let has = |kind: LoadKind| loads.iter().any(|load| load.kind == kind);
    let has_exclusive = loads.iter().any(|load| load.kind.needs_exclusive_circuit());

    let mut alerts = Vec::new();
    if zone_ids.len() > 1 {
        let names: Vec<&str> = zone_ids
            .iter()
            .map(|id| {
                request
                    .zones
                    .iter()
                    .find(|zone| zone.id == *id)
                    .map_or(UNKNOWN_ZONE_NAME, |zone| zone.name.as_str())
            })
            .collect();
        alerts.push(format!(
            "Mistura de Zonas: As cargas pertencem a zonas distintas ({}). \
O circuito final herdará as exigências da zona mais rigorosa.",
            names.join(", ")
        ));
    }
    if has(LoadKind::Lighting) && has(LoadKind::GeneralOutlet) {
        alerts.push(LIGHTING_WITH_OUTLETS_ALERT.to_string());
    }
    if has_exclusive && loads.len() > 1 {
        alerts.push(SHARED_DEDICATED_ALERT.to_string());
    }

    AnalysisReport {
        total_va: round2(total_va),
        total_w: round2(total_w),
        location_ids,
        zone_ids,
        alerts,
        is_valid: true,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
