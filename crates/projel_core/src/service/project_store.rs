//! Entity store: the authoritative aggregate and its command surface.
//!
//! # Responsibility
//! - Own every `Project` of one storage key and apply commands to it.
//! - Commit engine transitions atomically, then persist and notify.
//! - Route blocking errors and advisory warnings to subscribed sinks.
//!
//! # Invariants
//! - A failed command leaves the committed aggregate untouched.
//! - Persistence follows every durable commit and never fails a command;
//!   the last failure is kept in `last_persist_error`.
//! - Draft-only commands are committed in memory without persisting and
//!   without bumping the project's modification time.
//!
//! # See also
//! - `crate::engine` for the transformations applied here.

use crate::advisory::analysis::{
    analyze_grouping, AnalysisError, AnalysisRequest, ProposalAnalyzer,
};
use crate::engine::drafts::{self, DraftTarget};
use crate::engine::integrity::{audit, IntegrityViolation};
use crate::engine::lifecycle::{self, ProposalEdit};
use crate::engine::{assignment, cascade, commands};
use crate::engine::{EngineError, EngineResult, Transition, Warning};
use crate::model::circuit::{Circuit, CircuitDraft, CircuitId};
use crate::model::load::{Load, LoadId};
use crate::model::location::{Location, LocationId};
use crate::model::project::{ElectricalSystem, Project, ProjectId, ProjectPatch};
use crate::model::proposal::{DraftId, ProposalId, ProposalStatus};
use crate::model::zone::{Zone, ZoneId};
use crate::model::EntityKind;
use crate::repo::{ProjectRepository, RepoError};
use crate::service::suggestion::suggest_loads;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

static SEQUENTIAL_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^C(\d+)$").expect("valid circuit identifier regex"));

/// Failure of one store command. The aggregate is unchanged.
#[derive(Debug)]
pub enum StoreError {
    Engine(EngineError),
    ProjectNotFound(ProjectId),
    Analysis(AnalysisError),
    /// Only returned by `ProjectStore::load`.
    Repo(RepoError),
}

impl StoreError {
    /// Stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::Validation(_)) => "validation",
            Self::Engine(EngineError::Integrity(_)) => "integrity",
            Self::Engine(EngineError::NotFound { .. }) => "not_found",
            Self::Engine(EngineError::InvalidTransition { .. }) => "invalid_transition",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::Analysis(_) => "analysis",
            Self::Repo(_) => "repo",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Analysis(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::ProjectNotFound(_) => None,
            Self::Analysis(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<EngineError> for StoreError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<AnalysisError> for StoreError {
    fn from(value: AnalysisError) -> Self {
        Self::Analysis(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of a committed command.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

/// Tagged outcome pushed to sinks: blocking failures and advisory findings
/// never share a channel.
#[derive(Debug, Clone, Copy)]
pub enum Diagnostic<'a> {
    Blocking(&'a StoreError),
    Advisory(&'a Warning),
}

/// Observer for command diagnostics (toasts, status bars, test probes).
pub trait DiagnosticSink {
    fn deliver(&self, diagnostic: Diagnostic<'_>);
}

pub struct ProjectStore<R: ProjectRepository> {
    repo: R,
    projects: Vec<Project>,
    sinks: Vec<Rc<dyn DiagnosticSink>>,
    last_persist_error: Option<RepoError>,
}

impl<R: ProjectRepository> ProjectStore<R> {
    /// Starts with an empty aggregate, ignoring anything already persisted.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            projects: Vec::new(),
            sinks: Vec::new(),
            last_persist_error: None,
        }
    }

    /// Starts from the repository's persisted document.
    ///
    /// Projects that fail the integrity audit still load; each one logs a
    /// `store_audit` warning with its violation count.
    pub fn load(repo: R) -> Result<Self, StoreError> {
        let projects = match repo.load() {
            Ok(projects) => projects,
            Err(err) => {
                error!("event=store_load module=store status=error error={err}");
                return Err(err.into());
            }
        };
        info!(
            "event=store_load module=store status=ok projects={}",
            projects.len()
        );
        for project in &projects {
            let violations = audit(project);
            if !violations.is_empty() {
                warn!(
                    "event=store_audit module=store status=violations project_id={} count={}",
                    project.id,
                    violations.len()
                );
            }
        }
        Ok(Self {
            projects,
            ..Self::new(repo)
        })
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Last save failure; cleared by the next successful save.
    pub fn last_persist_error(&self) -> Option<&RepoError> {
        self.last_persist_error.as_ref()
    }

    pub fn subscribe(&mut self, sink: Rc<dyn DiagnosticSink>) {
        self.sinks.push(sink);
    }

    pub fn create_project(
        &mut self,
        name: &str,
        system: ElectricalSystem,
    ) -> Result<ProjectId, StoreError> {
        let project = Project::new(name.trim(), system);
        if let Err(err) = project.validate() {
            return Err(self.reject("create_project", project.id, EngineError::from(err).into()));
        }
        let id = project.id;
        self.projects.push(project);
        info!("event=create_project module=store status=ok project_id={id}");
        self.persist();
        Ok(id)
    }

    pub fn update_project(
        &mut self,
        project_id: ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("update_project", project_id, |project| {
            commands::update_project(project, patch)
        })
    }

    pub fn delete_project(&mut self, project_id: ProjectId) -> Result<(), StoreError> {
        let Some(index) = self.position(project_id) else {
            return Err(self.reject(
                "delete_project",
                project_id,
                StoreError::ProjectNotFound(project_id),
            ));
        };
        self.projects.remove(index);
        info!("event=delete_project module=store status=ok project_id={project_id}");
        self.persist();
        Ok(())
    }

    pub fn add_zone(
        &mut self,
        project_id: ProjectId,
        zone: Zone,
    ) -> Result<Applied<ZoneId>, StoreError> {
        self.execute("add_zone", project_id, |project| commands::add_zone(project, zone))
    }

    pub fn update_zone(
        &mut self,
        project_id: ProjectId,
        zone: Zone,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("update_zone", project_id, |project| {
            commands::update_zone(project, zone)
        })
    }

    /// Fails with `IntegrityError::ZoneInUse` while locations, circuits or
    /// inherited load zones reference the zone.
    pub fn remove_zone(
        &mut self,
        project_id: ProjectId,
        zone_id: ZoneId,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("remove_zone", project_id, |project| {
            cascade::remove_zone(project, zone_id)
        })
    }

    pub fn add_location(
        &mut self,
        project_id: ProjectId,
        location: Location,
    ) -> Result<Applied<LocationId>, StoreError> {
        self.execute("add_location", project_id, |project| {
            commands::add_location(project, location)
        })
    }

    pub fn update_location(
        &mut self,
        project_id: ProjectId,
        location: Location,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("update_location", project_id, |project| {
            commands::update_location(project, location)
        })
    }

    /// Removes the location and its loads; the value is the removed load count.
    pub fn remove_location(
        &mut self,
        project_id: ProjectId,
        location_id: LocationId,
    ) -> Result<Applied<usize>, StoreError> {
        self.execute("remove_location", project_id, |project| {
            cascade::remove_location(project, location_id)
        })
    }

    pub fn add_load(
        &mut self,
        project_id: ProjectId,
        load: Load,
    ) -> Result<Applied<LoadId>, StoreError> {
        self.execute("add_load", project_id, |project| commands::add_load(project, load))
    }

    /// Adds every load or none of them.
    pub fn add_loads(
        &mut self,
        project_id: ProjectId,
        loads: Vec<Load>,
    ) -> Result<Applied<Vec<LoadId>>, StoreError> {
        self.execute("add_loads", project_id, |project| {
            commands::add_loads(project, loads)
        })
    }

    pub fn update_load(
        &mut self,
        project_id: ProjectId,
        load: Load,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("update_load", project_id, |project| {
            commands::update_load(project, load)
        })
    }

    pub fn remove_load(
        &mut self,
        project_id: ProjectId,
        load_id: LoadId,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("remove_load", project_id, |project| {
            cascade::remove_load(project, load_id)
        })
    }

    /// Moves a load into a circuit, or out of any circuit with `None`.
    ///
    /// The value is `false` when the load or circuit does not exist; that
    /// case is a no-op, not an error.
    pub fn set_load_circuit(
        &mut self,
        project_id: ProjectId,
        load_id: LoadId,
        circuit_id: Option<CircuitId>,
    ) -> Result<Applied<bool>, StoreError> {
        self.execute("set_load_circuit", project_id, |project| {
            Ok(assignment::set_load_circuit(project, load_id, circuit_id))
        })
    }

    pub fn refresh_inherited_zones(
        &mut self,
        project_id: ProjectId,
        location_id: LocationId,
    ) -> Result<Applied<usize>, StoreError> {
        self.execute("refresh_inherited_zones", project_id, |project| {
            commands::refresh_inherited_zones(project, location_id)
        })
    }

    /// Adds the rule-derived lighting and outlet loads for every location.
    pub fn apply_suggestions(
        &mut self,
        project_id: ProjectId,
    ) -> Result<Applied<Vec<LoadId>>, StoreError> {
        self.execute("apply_suggestions", project_id, |project| {
            let loads = project
                .locations
                .iter()
                .flat_map(|location| {
                    suggest_loads(location)
                        .into_iter()
                        .map(move |suggestion| suggestion.into_load(location))
                })
                .collect();
            commands::add_loads(project, loads)
        })
    }

    pub fn add_proposal(
        &mut self,
        project_id: ProjectId,
        load_ids: &[LoadId],
        intent: &str,
        author: &str,
    ) -> Result<Applied<ProposalId>, StoreError> {
        self.execute("add_proposal", project_id, |project| {
            lifecycle::add_proposal(project, load_ids, intent, author)
        })
    }

    pub fn update_proposal(
        &mut self,
        project_id: ProjectId,
        proposal_id: ProposalId,
        edit: &ProposalEdit,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("update_proposal", project_id, |project| {
            lifecycle::update_proposal(project, proposal_id, edit)
        })
    }

    /// Fails with `IntegrityError::ProposalInUse` once formalized.
    pub fn remove_proposal(
        &mut self,
        project_id: ProjectId,
        proposal_id: ProposalId,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("remove_proposal", project_id, |project| {
            cascade::remove_proposal(project, proposal_id)
        })
    }

    pub fn discard_proposal(
        &mut self,
        project_id: ProjectId,
        proposal_id: ProposalId,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("discard_proposal", project_id, |project| {
            lifecycle::discard_proposal(project, proposal_id)
        })
    }

    /// Runs `analyzer` over the proposal's loads and records the outcome.
    ///
    /// The analyzer is called before anything is committed, so an analysis
    /// failure leaves the proposal exactly as it was.
    pub fn analyze_proposal(
        &mut self,
        project_id: ProjectId,
        proposal_id: ProposalId,
        analyzer: &dyn ProposalAnalyzer,
    ) -> Result<Applied<ProposalStatus>, StoreError> {
        const EVENT: &str = "analyze_proposal";
        let request = match self.analysis_request(project_id, proposal_id) {
            Ok(request) => request,
            Err(err) => return Err(self.reject(EVENT, project_id, err)),
        };
        let report = match analyzer.analyze(&request) {
            Ok(report) => report,
            Err(err) => return Err(self.reject(EVENT, project_id, err.into())),
        };
        self.execute(EVENT, project_id, |project| {
            lifecycle::record_analysis(project, proposal_id, &report)
        })
    }

    pub fn convert_proposal_to_circuit(
        &mut self,
        project_id: ProjectId,
        proposal_id: ProposalId,
        draft: CircuitDraft,
    ) -> Result<Applied<CircuitId>, StoreError> {
        self.execute("convert_proposal_to_circuit", project_id, |project| {
            lifecycle::convert_proposal_to_circuit(project, proposal_id, draft)
        })
    }

    pub fn add_circuit(
        &mut self,
        project_id: ProjectId,
        draft: CircuitDraft,
    ) -> Result<Applied<CircuitId>, StoreError> {
        self.execute("add_circuit", project_id, |project| {
            commands::add_circuit(project, draft)
        })
    }

    pub fn update_circuit(
        &mut self,
        project_id: ProjectId,
        circuit: Circuit,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("update_circuit", project_id, |project| {
            commands::update_circuit(project, circuit)
        })
    }

    /// Removes the circuit and clears the back-reference on its loads.
    pub fn remove_circuit(
        &mut self,
        project_id: ProjectId,
        circuit_id: CircuitId,
    ) -> Result<Applied<()>, StoreError> {
        self.execute("remove_circuit", project_id, |project| {
            cascade::remove_circuit(project, circuit_id)
        })
    }

    /// Suggests `C<n+1>`, `n` being the highest suffix among `C<digits>`
    /// identifiers (`C1` for a project without such circuits).
    pub fn next_circuit_identifier(&self, project_id: ProjectId) -> Result<String, StoreError> {
        let project = self.require(project_id)?;
        let highest = project
            .circuits
            .iter()
            .filter_map(|circuit| SEQUENTIAL_IDENTIFIER_RE.captures(&circuit.identifier))
            .filter_map(|captures| captures[1].parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("C{}", highest.saturating_add(1)))
    }

    pub fn audit(&self, project_id: ProjectId) -> Result<Vec<IntegrityViolation>, StoreError> {
        Ok(audit(self.require(project_id)?))
    }

    pub fn add_draft(
        &mut self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Applied<DraftId>, StoreError> {
        self.execute_local("add_draft", project_id, |project| {
            drafts::add_draft(project, name)
        })
    }

    pub fn rename_draft(
        &mut self,
        project_id: ProjectId,
        draft_id: DraftId,
        name: &str,
    ) -> Result<Applied<()>, StoreError> {
        self.execute_local("rename_draft", project_id, |project| {
            drafts::rename_draft(project, draft_id, name)
        })
    }

    pub fn remove_draft(
        &mut self,
        project_id: ProjectId,
        draft_id: DraftId,
    ) -> Result<Applied<()>, StoreError> {
        self.execute_local("remove_draft", project_id, |project| {
            drafts::remove_draft(project, draft_id)
        })
    }

    pub fn move_loads(
        &mut self,
        project_id: ProjectId,
        load_ids: &[LoadId],
        target: DraftTarget,
    ) -> Result<Applied<()>, StoreError> {
        self.execute_local("move_loads", project_id, |project| {
            drafts::move_loads(project, load_ids, target)
        })
    }

    pub fn free_loads(&self, project_id: ProjectId) -> Result<Vec<LoadId>, StoreError> {
        Ok(drafts::free_loads(self.require(project_id)?))
    }

    pub fn suggest_drafts(
        &mut self,
        project_id: ProjectId,
    ) -> Result<Applied<Vec<DraftId>>, StoreError> {
        self.execute_local("suggest_drafts", project_id, |project| {
            Ok(drafts::suggest_drafts(project))
        })
    }

    /// Turns a draft into an analyzed proposal using the local rule check.
    pub fn submit_draft(
        &mut self,
        project_id: ProjectId,
        draft_id: DraftId,
        author: &str,
    ) -> Result<Applied<ProposalId>, StoreError> {
        self.execute("submit_draft", project_id, |project| {
            let loads = project
                .draft(draft_id)
                .map(|draft| {
                    draft
                        .load_ids
                        .iter()
                        .filter_map(|id| project.load(*id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            let report = analyze_grouping(&AnalysisRequest {
                loads,
                zones: project.zones.clone(),
            });
            drafts::submit_draft(project, draft_id, author, &report)
        })
    }

    fn analysis_request(
        &self,
        project_id: ProjectId,
        proposal_id: ProposalId,
    ) -> Result<AnalysisRequest, StoreError> {
        let project = self.require(project_id)?;
        let status = project
            .proposal(proposal_id)
            .map(|proposal| proposal.status)
            .ok_or_else(|| EngineError::not_found(EntityKind::Proposal, proposal_id))?;
        if !status.can_transition_to(ProposalStatus::Analyzed) {
            return Err(EngineError::InvalidTransition {
                from: status,
                to: ProposalStatus::Analyzed,
            }
            .into());
        }
        Ok(lifecycle::analysis_request(project, proposal_id)?)
    }

    fn position(&self, project_id: ProjectId) -> Option<usize> {
        self.projects.iter().position(|project| project.id == project_id)
    }

    fn require(&self, project_id: ProjectId) -> Result<&Project, StoreError> {
        self.project(project_id)
            .ok_or(StoreError::ProjectNotFound(project_id))
    }

    fn execute<T>(
        &mut self,
        event: &'static str,
        project_id: ProjectId,
        op: impl FnOnce(&Project) -> EngineResult<Transition<T>>,
    ) -> Result<Applied<T>, StoreError> {
        self.run(event, project_id, true, op)
    }

    /// Commits draft-only transitions: no timestamp bump and no save.
    fn execute_local<T>(
        &mut self,
        event: &'static str,
        project_id: ProjectId,
        op: impl FnOnce(&Project) -> EngineResult<Transition<T>>,
    ) -> Result<Applied<T>, StoreError> {
        self.run(event, project_id, false, op)
    }

    /// A transition that leaves the project equal to the committed one is
    /// neither touched nor saved.
    fn run<T>(
        &mut self,
        event: &'static str,
        project_id: ProjectId,
        durable: bool,
        op: impl FnOnce(&Project) -> EngineResult<Transition<T>>,
    ) -> Result<Applied<T>, StoreError> {
        let Some(index) = self.position(project_id) else {
            return Err(self.reject(event, project_id, StoreError::ProjectNotFound(project_id)));
        };
        let transition = match op(&self.projects[index]) {
            Ok(transition) => transition,
            Err(err) => return Err(self.reject(event, project_id, err.into())),
        };

        let Transition {
            mut project,
            value,
            warnings,
        } = transition;
        let changed = project != self.projects[index];
        if changed {
            if durable {
                project.touch();
            }
            self.projects[index] = project;
        }
        info!(
            "event={event} module=store status={} project_id={project_id} warnings={}",
            if changed { "ok" } else { "unchanged" },
            warnings.len()
        );
        for warning in &warnings {
            self.notify(Diagnostic::Advisory(warning));
        }
        if changed && durable {
            self.persist();
        }
        Ok(Applied { value, warnings })
    }

    fn reject(&self, event: &'static str, project_id: ProjectId, err: StoreError) -> StoreError {
        warn!(
            "event={event} module=store status=error project_id={project_id} error_kind={}",
            err.code()
        );
        self.notify(Diagnostic::Blocking(&err));
        err
    }

    fn notify(&self, diagnostic: Diagnostic<'_>) {
        for sink in &self.sinks {
            sink.deliver(diagnostic);
        }
    }

    fn persist(&mut self) {
        match self.repo.save(&self.projects) {
            Ok(()) => self.last_persist_error = None,
            Err(err) => {
                error!("event=persist module=store status=error error={err}");
                self.last_persist_error = Some(err);
            }
        }
    }
}
