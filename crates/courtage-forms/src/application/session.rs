//! Editor session
//!
//! Holds the single structure being edited, the current selection and
//! the dirty flag between two saves.

use std::sync::Arc;

use crate::application::dto::SaveFormTemplateCommand;
use crate::domain::aggregates::{FormTemplate, TemplateMetadata};
use crate::domain::structure::{
    CalculationRuleBlock, EditError, FieldDefinition, FieldPatch, FormStructure, IntoPhaseId, ParseWarning, SubStep,
};
use crate::domain::value_objects::{EntityId, FieldType};
use crate::ports::inbound::{FormTemplateUseCases, UseCaseError};

pub struct EditorSession {
    templates: Arc<dyn FormTemplateUseCases>,
    template_id: Option<EntityId>,
    metadata: TemplateMetadata,
    structure: FormStructure,
    load_warnings: Vec<ParseWarning>,
    selected_step: Option<String>,
    selected_field: Option<String>,
    dirty: bool,
}

impl EditorSession {
    /// Session for a template that does not exist yet
    pub fn new(templates: Arc<dyn FormTemplateUseCases>, metadata: TemplateMetadata) -> Self {
        Self {
            templates,
            template_id: None,
            metadata,
            structure: FormStructure::new(),
            load_warnings: vec![],
            selected_step: None,
            selected_field: None,
            dirty: false,
        }
    }

    /// Session on a persisted template
    pub async fn open(templates: Arc<dyn FormTemplateUseCases>, id: &EntityId) -> Result<Self, UseCaseError> {
        let loaded = templates.load_template(id).await?;
        let mut session = Self::new(templates, loaded.template.metadata().clone());
        session.template_id = Some(id.clone());
        session.structure = loaded.template.structure().clone();
        session.load_warnings = loaded.warnings;
        Ok(session)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn template_id(&self) -> Option<&EntityId> { self.template_id.as_ref() }
    pub fn metadata(&self) -> &TemplateMetadata { &self.metadata }
    pub fn structure(&self) -> &FormStructure { &self.structure }
    pub fn load_warnings(&self) -> &[ParseWarning] { &self.load_warnings }
    pub fn is_dirty(&self) -> bool { self.dirty }

    pub fn set_metadata(&mut self, metadata: TemplateMetadata) {
        self.metadata = metadata;
        self.dirty = true;
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a sub-step; unknown ids leave the selection untouched
    pub fn select_step(&mut self, step_id: &str) -> bool {
        if self.structure.find_step(step_id).is_none() {
            return false;
        }
        self.selected_step = Some(step_id.to_string());
        true
    }

    /// Select a field; unknown ids leave the selection untouched
    pub fn select_field(&mut self, field_id: &str) -> bool {
        if self.structure.find_field(field_id).is_none() {
            return false;
        }
        self.selected_field = Some(field_id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected_step = None;
        self.selected_field = None;
    }

    pub fn selected_step(&self) -> Option<&SubStep> {
        let id = self.selected_step.as_deref()?;
        self.structure.find_step(id).map(|(_, step)| step)
    }

    pub fn selected_field(&self) -> Option<&FieldDefinition> {
        let id = self.selected_field.as_deref()?;
        self.structure.find_field(id)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn add_step(&mut self, phase: impl IntoPhaseId, title: impl Into<String>) -> Result<String, EditError> {
        let id = self.structure.add_step(phase, title)?;
        self.selected_step = Some(id.clone());
        self.dirty = true;
        Ok(id)
    }

    pub fn add_calculation_step(&mut self, phase: impl IntoPhaseId, title: impl Into<String>) -> Result<String, EditError> {
        let id = self.structure.add_calculation_step(phase, title)?;
        self.selected_step = Some(id.clone());
        self.dirty = true;
        Ok(id)
    }

    pub fn remove_step(&mut self, phase: impl IntoPhaseId, step_id: &str) -> Result<SubStep, EditError> {
        let removed = self.structure.remove_step(phase, step_id)?;
        if self.selected_step.as_deref() == Some(step_id) {
            self.selected_step = None;
        }
        if let Some(fields) = removed.field_list() {
            if fields.iter().any(|f| Some(f.id.as_str()) == self.selected_field.as_deref()) {
                self.selected_field = None;
            }
        }
        self.dirty = true;
        Ok(removed)
    }

    pub fn rename_step(&mut self, step_id: &str, title: impl Into<String>) -> Result<(), EditError> {
        self.structure.rename_step(step_id, title)?;
        self.dirty = true;
        Ok(())
    }

    pub fn reorder_steps(&mut self, phase: impl IntoPhaseId, from: usize, to: usize) -> Result<(), EditError> {
        self.structure.reorder_steps(phase, from, to)?;
        self.dirty = true;
        Ok(())
    }

    pub fn add_field(&mut self, phase: impl IntoPhaseId, step_id: &str, field_type: FieldType) -> Result<String, EditError> {
        let id = self.structure.add_field(phase, step_id, field_type)?;
        self.selected_field = Some(id.clone());
        self.dirty = true;
        Ok(id)
    }

    pub fn update_field(&mut self, field_id: &str, patch: FieldPatch) -> Result<(), EditError> {
        self.structure.update_field(field_id, patch)?;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_field(&mut self, field_id: &str) -> Result<FieldDefinition, EditError> {
        let removed = self.structure.remove_field(field_id)?;
        if self.selected_field.as_deref() == Some(field_id) {
            self.selected_field = None;
        }
        self.dirty = true;
        Ok(removed)
    }

    pub fn reorder_fields(&mut self, step_id: &str, from: usize, to: usize) -> Result<(), EditError> {
        self.structure.reorder_fields(step_id, from, to)?;
        self.dirty = true;
        Ok(())
    }

    pub fn calculation_rules_mut(&mut self, step_id: &str) -> Result<&mut CalculationRuleBlock, EditError> {
        let rules = self.structure.calculation_rules_mut(step_id)?;
        self.dirty = true;
        Ok(rules)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Persist the current state; on failure everything in memory is kept
    pub async fn save(&mut self) -> Result<FormTemplate, UseCaseError> {
        let command = SaveFormTemplateCommand {
            template_id: self.template_id.clone(),
            metadata: self.metadata.clone(),
            structure: self.structure.clone(),
        };

        match self.templates.save_template(command).await {
            Ok(template) => {
                self.template_id = Some(template.id().clone());
                self.dirty = false;
                Ok(template)
            }
            Err(e) => {
                tracing::warn!("Save failed, keeping unsaved changes: {}", e);
                Err(e)
            }
        }
    }

    /// Drop unsaved changes and return to the last persisted version
    pub async fn discard(&mut self) -> Result<(), UseCaseError> {
        match &self.template_id {
            Some(id) => {
                let loaded = self.templates.load_template(id).await?;
                self.metadata = loaded.template.metadata().clone();
                self.structure = loaded.template.structure().clone();
                self.load_warnings = loaded.warnings;
            }
            None => self.structure = FormStructure::new(),
        }

        if self.selected_step().is_none() {
            self.selected_step = None;
        }
        if self.selected_field().is_none() {
            self.selected_field = None;
        }
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::FormTemplateService;
    use crate::config::FormsConfig;
    use crate::domain::value_objects::FormCategory;
    use crate::domain::DomainEvent;
    use crate::infrastructure::persistence::{InMemoryFormTemplateRepository, NoOpEventPublisher};
    use crate::ports::outbound::{EventPublisher, FormTemplateRepository, RepositoryError};
    use async_trait::async_trait;

    struct FailingEventPublisher;

    #[async_trait]
    impl EventPublisher for FailingEventPublisher {
        async fn publish(&self, _events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection("bus down".into()))
        }
    }

    fn setup() -> (Arc<InMemoryFormTemplateRepository>, EditorSession) {
        let repo = Arc::new(InMemoryFormTemplateRepository::new());
        let service = Arc::new(FormTemplateService::new(
            repo.clone(),
            Arc::new(NoOpEventPublisher),
            FormsConfig::default(),
        ));
        let session = EditorSession::new(service, TemplateMetadata::new("Habitation", FormCategory::NonVie, "mrh"));
        (repo, session)
    }

    #[test]
    fn test_removing_selected_field_clears_selection() {
        let (_, mut session) = setup();
        let step = session.add_step("cotation", "Logement").unwrap();
        let surface = session.add_field("cotation", &step, FieldType::Number).unwrap();
        let rooms = session.add_field("cotation", &step, FieldType::Number).unwrap();

        assert!(session.select_field(&surface));
        session.remove_field(&rooms).unwrap();
        assert_eq!(session.selected_field().map(|f| f.id.as_str()), Some(surface.as_str()));

        session.remove_field(&surface).unwrap();
        assert!(session.selected_field().is_none());
    }

    #[test]
    fn test_removing_step_clears_step_and_field_selection() {
        let (_, mut session) = setup();
        let step = session.add_step("souscription", "Assuré").unwrap();
        let field = session.add_field("souscription", &step, FieldType::Email).unwrap();

        assert!(session.select_step(&step));
        assert!(session.select_field(&field));
        session.remove_step("souscription", &step).unwrap();

        assert!(session.selected_step().is_none());
        assert!(session.selected_field().is_none());
    }

    #[test]
    fn test_selecting_unknown_ids_is_refused() {
        let (_, mut session) = setup();
        assert!(!session.select_step("step_missing"));
        assert!(!session.select_field("field_missing"));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_save_clears_dirty_flag() {
        let (repo, mut session) = setup();
        session.add_step("cotation", "Logement").unwrap();
        assert!(session.is_dirty());

        let saved = session.save().await.unwrap();
        assert!(!session.is_dirty());
        assert_eq!(session.template_id(), Some(saved.id()));

        session.add_step("cotation", "Garanties").unwrap();
        session.save().await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_unsaved_structure() {
        let (repo, mut session) = setup();
        let step = session.add_step("cotation", "Logement").unwrap();
        session.add_field("cotation", &step, FieldType::Currency).unwrap();
        let before = session.structure().clone();

        repo.set_offline(true);
        let err = session.save().await.unwrap_err();
        assert!(err.is_persistence_failure());
        assert!(session.is_dirty());
        assert_eq!(session.structure(), &before);

        repo.set_offline(false);
        session.save().await.unwrap();
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_discard_returns_to_saved_version() {
        let (_, mut session) = setup();
        let step = session.add_step("cotation", "Logement").unwrap();
        session.save().await.unwrap();
        let saved = session.structure().clone();

        let field = session.add_field("cotation", &step, FieldType::Text).unwrap();
        assert!(session.selected_field().is_some());
        session.discard().await.unwrap();

        assert_eq!(session.structure(), &saved);
        assert!(session.structure().find_field(&field).is_none());
        assert!(session.selected_field().is_none());
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_save_survives_event_bus_outage() {
        let repo = Arc::new(InMemoryFormTemplateRepository::new());
        let service = Arc::new(FormTemplateService::new(
            repo.clone(),
            Arc::new(FailingEventPublisher),
            FormsConfig::default(),
        ));
        let mut session = EditorSession::new(service, TemplateMetadata::new("Habitation", FormCategory::NonVie, "mrh"));

        session.add_step("cotation", "Logement").unwrap();
        let saved = session.save().await.unwrap();
        assert_eq!(session.template_id(), Some(saved.id()));
        assert!(!session.is_dirty());

        session.add_step("cotation", "Garanties").unwrap();
        session.save().await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
