//! Command handlers
//!
//! Application services that orchestrate use cases.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::*;
use crate::config::FormsConfig;
use crate::domain::aggregates::{FormTemplate, LinkPatch, ProductFormLink, TemplateMetadata};
use crate::domain::services::StructureValidator;
use crate::domain::structure::FormStructure;
use crate::domain::value_objects::{Channel, EntityId, FormCategory};
use crate::domain::DomainEvent;
use crate::ports::inbound::{FormTemplateUseCases, ProductFormLinkUseCases, UseCaseError};
use crate::ports::outbound::{
    CalcRuleCatalog, CalcRuleSummary, EventPublisher, FormTemplateRecord, FormTemplateRepository,
    ProductCatalog, ProductFormLinkRepository, RepositoryError,
};

/// Publish events of a change that is already stored.
///
/// A failing publisher must not hide the stored state from the caller, so
/// the failure is only logged.
async fn publish_committed(publisher: &dyn EventPublisher, events: Vec<DomainEvent>) {
    if events.is_empty() {
        return;
    }
    let names: Vec<&'static str> = events.iter().map(DomainEvent::name).collect();
    if let Err(e) = publisher.publish(events).await {
        tracing::warn!("Failed to publish {:?}: {}", names, e);
    }
}

// =============================================================================
// Form Templates
// =============================================================================

/// Form template application service
pub struct FormTemplateService {
    template_repo: Arc<dyn FormTemplateRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    config: FormsConfig,
}

impl FormTemplateService {
    pub fn new(
        template_repo: Arc<dyn FormTemplateRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        config: FormsConfig,
    ) -> Self {
        Self {
            template_repo,
            event_publisher,
            config,
        }
    }

    pub fn config(&self) -> &FormsConfig {
        &self.config
    }

    fn check_structure(&self, structure: &FormStructure) -> Result<(), UseCaseError> {
        let report = StructureValidator::validate(structure);
        for issue in report.warnings() {
            tracing::debug!("Structure warning: {}", issue);
        }
        if self.config.reject_invalid_structures && !report.is_valid() {
            let errors: Vec<String> = report.errors().map(ToString::to_string).collect();
            return Err(UseCaseError::Validation(errors.join("; ")));
        }
        Ok(())
    }

    fn encode(
        &self,
        id: Option<EntityId>,
        metadata: &TemplateMetadata,
        structure: &FormStructure,
        is_active: bool,
    ) -> Result<FormTemplateRecord, UseCaseError> {
        let steps = structure
            .to_storage(self.config.storage_format)
            .map_err(|e| UseCaseError::Validation(e.to_string()))?;
        let now = Utc::now();

        Ok(FormTemplateRecord {
            id,
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            category: metadata.category,
            product_type: metadata.product_type.clone(),
            target_channels: metadata.target_channels.clone(),
            steps,
            is_active,
            created_at: now,
            updated_at: now,
        })
    }

    fn decode(record: FormTemplateRecord) -> Result<LoadedTemplate, UseCaseError> {
        let id = record
            .id
            .ok_or_else(|| RepositoryError::Serialization("template row without id".into()))?;
        let parsed = FormStructure::from_storage(Some(&record.steps));
        let metadata = TemplateMetadata {
            name: record.name,
            description: record.description,
            category: record.category,
            product_type: record.product_type,
            target_channels: record.target_channels,
        };

        Ok(LoadedTemplate {
            template: FormTemplate::restore(
                id,
                metadata,
                parsed.structure,
                record.is_active,
                record.created_at,
                record.updated_at,
            ),
            warnings: parsed.warnings,
        })
    }

    async fn find(&self, id: &EntityId) -> Result<LoadedTemplate, UseCaseError> {
        let record = self.template_repo.find_by_id(id).await?
            .ok_or_else(|| UseCaseError::NotFound(format!("form template {}", id)))?;
        Self::decode(record)
    }

    async fn store(&self, template: &FormTemplate) -> Result<(), UseCaseError> {
        let record = self.encode(
            Some(template.id().clone()),
            template.metadata(),
            template.structure(),
            template.is_active(),
        )?;
        self.template_repo.save(&record).await?;
        Ok(())
    }

    async fn summaries(&self) -> Result<Vec<FormTemplate>, UseCaseError> {
        let mut templates = Vec::new();
        for record in self.template_repo.list().await? {
            templates.push(Self::decode(record)?.template);
        }
        templates.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(templates)
    }
}

#[async_trait]
impl FormTemplateUseCases for FormTemplateService {
    async fn create_template(&self, command: CreateFormTemplateCommand) -> Result<FormTemplate, UseCaseError> {
        self.check_structure(&command.structure)?;

        let record = self.encode(None, &command.metadata, &command.structure, true)?;
        let id = self.template_repo.save(&record).await?;
        let mut template = FormTemplate::create(id, command.metadata, command.structure);

        tracing::info!("Created form template {} ({})", template.id(), template.name());
        publish_committed(self.event_publisher.as_ref(), template.take_events()).await;

        Ok(template)
    }

    async fn update_template(&self, command: UpdateFormTemplateCommand) -> Result<FormTemplate, UseCaseError> {
        let mut template = self.find(&command.template_id).await?.template;

        if let Some(metadata) = command.metadata {
            template.update_metadata(metadata);
        }
        if let Some(structure) = command.structure {
            self.check_structure(&structure)?;
            template.replace_structure(structure);
        }
        match command.is_active {
            Some(true) => template.activate(),
            Some(false) => template.deactivate(),
            None => {}
        }

        self.store(&template).await?;
        tracing::info!("Updated form template {}", template.id());
        publish_committed(self.event_publisher.as_ref(), template.take_events()).await;

        Ok(template)
    }

    async fn save_template(&self, command: SaveFormTemplateCommand) -> Result<FormTemplate, UseCaseError> {
        match command.template_id {
            None => {
                self.create_template(CreateFormTemplateCommand {
                    metadata: command.metadata,
                    structure: command.structure,
                })
                .await
            }
            Some(template_id) => {
                self.update_template(UpdateFormTemplateCommand {
                    template_id,
                    metadata: Some(command.metadata),
                    structure: Some(command.structure),
                    is_active: None,
                })
                .await
            }
        }
    }

    async fn load_template(&self, id: &EntityId) -> Result<LoadedTemplate, UseCaseError> {
        let loaded = self.find(id).await?;
        if loaded.template.structure().is_empty() {
            tracing::warn!("Form template {} has no steps configured", id);
        }
        Ok(loaded)
    }

    async fn duplicate_template(&self, source_id: &EntityId, name: Option<String>) -> Result<FormTemplate, UseCaseError> {
        let source = self.find(source_id).await?.template;
        let name = name.unwrap_or_else(|| self.config.copy_name(source.name()));

        let mut metadata = source.metadata().clone();
        metadata.name = name.clone();
        let record = self.encode(None, &metadata, source.structure(), source.is_active())?;
        let copy_id = self.template_repo.save(&record).await?;

        let mut copy = source.duplicate(copy_id, name);
        tracing::info!("Duplicated form template {} into {}", source_id, copy.id());
        publish_committed(self.event_publisher.as_ref(), copy.take_events()).await;

        Ok(copy)
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, UseCaseError> {
        Ok(self.summaries().await?.iter().map(TemplateSummary::from).collect())
    }

    async fn suggest_templates(&self, category: FormCategory, product_type: &str) -> Result<Vec<TemplateSummary>, UseCaseError> {
        Ok(self.summaries().await?
            .iter()
            .filter(|t| t.is_active() && t.matches(category, product_type))
            .map(TemplateSummary::from)
            .collect())
    }

    async fn delete_template(&self, id: &EntityId) -> Result<(), UseCaseError> {
        let mut template = self.find(id).await?.template;

        self.template_repo.delete(id).await?;
        template.mark_deleted();
        tracing::info!("Deleted form template {}", id);
        publish_committed(self.event_publisher.as_ref(), template.take_events()).await;

        Ok(())
    }
}

// =============================================================================
// Product-Form Links
// =============================================================================

/// Product-form link application service
pub struct ProductFormLinkService {
    link_repo: Arc<dyn ProductFormLinkRepository>,
    templates: Arc<dyn FormTemplateUseCases>,
    template_repo: Arc<dyn FormTemplateRepository>,
    products: Arc<dyn ProductCatalog>,
    calc_rules: Arc<dyn CalcRuleCatalog>,
    event_publisher: Arc<dyn EventPublisher>,
    config: FormsConfig,
}

impl ProductFormLinkService {
    pub fn new(
        link_repo: Arc<dyn ProductFormLinkRepository>,
        templates: Arc<dyn FormTemplateUseCases>,
        template_repo: Arc<dyn FormTemplateRepository>,
        products: Arc<dyn ProductCatalog>,
        calc_rules: Arc<dyn CalcRuleCatalog>,
        event_publisher: Arc<dyn EventPublisher>,
        config: FormsConfig,
    ) -> Self {
        Self {
            link_repo,
            templates,
            template_repo,
            products,
            calc_rules,
            event_publisher,
            config,
        }
    }

    /// Resolve names for display; dangling ids get the configured labels
    async fn view(&self, link: &ProductFormLink) -> Result<LinkView, UseCaseError> {
        let mut orphans = Vec::new();

        let product_name = match self.products.find_by_id(link.product_id()).await? {
            Some(product) => product.name,
            None => {
                orphans.push(OrphanedReference::Product(link.product_id().clone()));
                self.config.unknown_product_label.clone()
            }
        };

        let form_template_name = match self.template_repo.find_by_id(link.form_template_id()).await? {
            Some(record) => record.name,
            None => {
                orphans.push(OrphanedReference::FormTemplate(link.form_template_id().clone()));
                self.config.unknown_form_label.clone()
            }
        };

        let calc_rule_name = match link.calc_rule_id() {
            Some(rule_id) => match self.calc_rules.find_by_id(rule_id).await? {
                Some(rule) => Some(rule.name),
                None => {
                    orphans.push(OrphanedReference::CalcRule(rule_id.clone()));
                    Some(self.config.unknown_calc_rule_label.clone())
                }
            },
            None => None,
        };

        for orphan in &orphans {
            tracing::warn!("Link {}: {}", link.id(), orphan);
        }

        Ok(LinkView {
            link_id: link.id().clone(),
            product_id: link.product_id().clone(),
            product_name,
            form_template_id: link.form_template_id().clone(),
            form_template_name,
            calc_rule_id: link.calc_rule_id().cloned(),
            calc_rule_name,
            channel: link.channel(),
            is_active: link.is_active(),
            display_order: link.display_order(),
            orphans,
        })
    }

    async fn views(&self, mut links: Vec<ProductFormLink>) -> Result<Vec<LinkView>, UseCaseError> {
        links.sort_by_key(|l| (l.display_order(), l.created_at()));
        let mut views = Vec::with_capacity(links.len());
        for link in &links {
            views.push(self.view(link).await?);
        }
        Ok(views)
    }
}

#[async_trait]
impl ProductFormLinkUseCases for ProductFormLinkService {
    async fn link(&self, command: LinkCommand) -> Result<ProductFormLink, UseCaseError> {
        let mut link = ProductFormLink::create(
            command.product_id,
            command.form_template_id,
            command.channel,
            command.display_order,
        );
        let events = link.take_events();

        match self.link_repo.insert(&link).await {
            Ok(()) => {}
            Err(RepositoryError::DuplicateKey(_)) => {
                tracing::info!(
                    "Form template {} already linked to product {}",
                    link.form_template_id(),
                    link.product_id()
                );
                return Err(UseCaseError::DuplicateLink {
                    product_id: link.product_id().clone(),
                    form_template_id: link.form_template_id().clone(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            "Linked form template {} to product {} ({})",
            link.form_template_id(),
            link.product_id(),
            link.channel()
        );
        publish_committed(self.event_publisher.as_ref(), events).await;

        Ok(link)
    }

    async fn link_new_template(
        &self,
        product_id: &EntityId,
        command: CreateFormTemplateCommand,
        channel: Channel,
        display_order: i32,
    ) -> Result<(FormTemplate, ProductFormLink), UseCaseError> {
        let template = self.templates.create_template(command).await?;
        let link = self.link(LinkCommand {
            product_id: product_id.clone(),
            form_template_id: template.id().clone(),
            channel,
            display_order,
        })
        .await?;
        Ok((template, link))
    }

    async fn link_duplicate(
        &self,
        product_id: &EntityId,
        source_template_id: &EntityId,
        channel: Channel,
        display_order: i32,
    ) -> Result<(FormTemplate, ProductFormLink), UseCaseError> {
        let template = self.templates.duplicate_template(source_template_id, None).await?;
        let link = self.link(LinkCommand {
            product_id: product_id.clone(),
            form_template_id: template.id().clone(),
            channel,
            display_order,
        })
        .await?;
        Ok((template, link))
    }

    async fn unlink(&self, link_id: &EntityId) -> Result<(), UseCaseError> {
        let Some(mut link) = self.link_repo.find_by_id(link_id).await? else {
            tracing::debug!("Link {} already removed", link_id);
            return Ok(());
        };

        match self.link_repo.delete(link_id).await {
            Ok(()) | Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        link.mark_unlinked();
        tracing::info!("Unlinked form template {} from product {}", link.form_template_id(), link.product_id());
        publish_committed(self.event_publisher.as_ref(), link.take_events()).await;

        Ok(())
    }

    async fn update_link(&self, link_id: &EntityId, patch: LinkPatch) -> Result<ProductFormLink, UseCaseError> {
        let mut link = self.link_repo.find_by_id(link_id).await?
            .ok_or_else(|| UseCaseError::NotFound(format!("link {}", link_id)))?;

        link.apply(patch);
        let events = link.take_events();
        self.link_repo.update(&link).await?;
        publish_committed(self.event_publisher.as_ref(), events).await;

        Ok(link)
    }

    async fn list_for_product(&self, product_id: &EntityId) -> Result<Vec<LinkView>, UseCaseError> {
        let links = self.link_repo.find_by_product(product_id).await?;
        self.views(links).await
    }

    async fn list_for_form_template(&self, form_template_id: &EntityId) -> Result<Vec<LinkView>, UseCaseError> {
        let links = self.link_repo.find_by_form_template(form_template_id).await?;
        self.views(links).await
    }

    async fn calc_rule_options(&self, usage_category: Option<&str>) -> Result<Vec<CalcRuleSummary>, UseCaseError> {
        let mut rules = self.calc_rules.list(usage_category).await?;
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rules)
    }
}
