//! User-dependency registry.
//!
//! Business modules register how to find the records a user owns and how to
//! hand those records to someone else. Deactivation and reassignment then work
//! across every module without knowing any of them.
//!
//! The registry is an ordinary value shared through application state. Module
//! order is registration order; re-registering a module keeps its position.
//! Neither lock is held across an `.await` or while listeners run.

pub mod source;
pub mod types;

use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub use source::{DependencySource, SourceError};
pub use types::{
    DependencyCategory, DependencyItem, ListenerId, ModuleDescriptor, ReassignReport, ReassignmentCount,
    ReassignmentFailure, RegistryEvent, UserDependencies,
};

use source::{ErasedSource, SourceAdapter};

type Listener = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

#[derive(Clone)]
struct RegisteredModule {
    descriptor: ModuleDescriptor,
    source: Arc<dyn ErasedSource>,
}

#[derive(Default)]
pub struct DependencyRegistry {
    modules: RwLock<Vec<RegisteredModule>>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `descriptor.module`, replacing any previous
    /// registration for that module
    pub fn register<S: DependencySource>(&self, descriptor: ModuleDescriptor, source: S) {
        let module_id = descriptor.module.clone();
        let entry = RegisteredModule {
            descriptor,
            source: Arc::new(SourceAdapter(source)),
        };

        {
            let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
            match modules.iter_mut().find(|m| m.descriptor.module == module_id) {
                Some(existing) => *existing = entry,
                None => modules.push(entry),
            }
        }

        tracing::debug!("Registered dependency module '{}'", module_id);
        self.notify(&RegistryEvent::Registered(module_id));
    }

    /// Remove a module. Returns false (and notifies nobody) when it was not registered.
    pub fn unregister(&self, module_id: &str) -> bool {
        let removed = {
            let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
            let before = modules.len();
            modules.retain(|m| m.descriptor.module != module_id);
            modules.len() != before
        };

        if removed {
            tracing::debug!("Unregistered dependency module '{}'", module_id);
            self.notify(&RegistryEvent::Unregistered(module_id.to_string()));
        }
        removed
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn notify(&self, event: &RegistryEvent) {
        let listeners: Vec<Listener> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in listeners {
            listener(event);
        }
    }

    fn snapshot(&self) -> Vec<RegisteredModule> {
        self.modules.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn modules(&self) -> Vec<ModuleDescriptor> {
        self.snapshot().into_iter().map(|m| m.descriptor).collect()
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|m| m.descriptor.module == module_id)
    }

    pub fn len(&self) -> usize {
        self.modules.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect the records `user_id` owns in every module. A module that fails
    /// to enumerate is logged and left out; modules with no matches are omitted.
    pub async fn query_dependencies(&self, user_id: &str, user_name: &str) -> UserDependencies {
        let modules = self.snapshot();

        let results = join_all(modules.iter().map(|m| m.source.owned_items(user_id, &m.descriptor))).await;

        let mut categories = Vec::new();
        for (module, result) in modules.into_iter().zip(results) {
            let items = match result {
                Ok(items) => items,
                Err(e) => {
                    tracing::error!(
                        "Dependency module '{}' failed to enumerate items for user '{}': {}",
                        module.descriptor.module,
                        user_id,
                        e
                    );
                    continue;
                }
            };

            if items.is_empty() {
                continue;
            }

            let descriptor = module.descriptor;
            categories.push(DependencyCategory {
                module: descriptor.module,
                label: descriptor.label,
                icon: descriptor.icon,
                owner_field: descriptor.owner_field,
                count: items.len(),
                can_reassign: module.source.allows_reassign(),
                items,
            });
        }

        let total_count = categories.iter().map(|c| c.count).sum();
        UserDependencies {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            total_count,
            has_items: total_count > 0,
            categories,
        }
    }

    /// Reassign every item of every reassignable category from `from_user_id`
    /// to `to_user_id` (`None` unassigns). Item failures are logged, recorded
    /// in the report and skipped.
    pub async fn reassign(
        &self,
        from_user_id: &str,
        to_user_id: Option<&str>,
        categories: &[DependencyCategory],
    ) -> ReassignReport {
        let modules = self.snapshot();
        let mut report = ReassignReport::default();

        for category in categories {
            if !category.can_reassign {
                tracing::debug!("Skipping non-reassignable dependency module '{}'", category.module);
                continue;
            }

            let Some(module) = modules.iter().find(|m| m.descriptor.module == category.module) else {
                tracing::warn!("Dependency module '{}' is not registered, skipping reassignment", category.module);
                continue;
            };

            let mut count = 0;
            for item in &category.items {
                match module.source.reassign_item(&item.id, to_user_id).await {
                    Ok(()) => count += 1,
                    Err(e) => {
                        tracing::error!(
                            "Failed to reassign {} '{}' from '{}' to {:?}: {}",
                            category.module,
                            item.id,
                            from_user_id,
                            to_user_id,
                            e
                        );
                        report.failures.push(ReassignmentFailure {
                            module: category.module.clone(),
                            item_id: item.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            if count > 0 {
                report.reassigned.push(ReassignmentCount {
                    module: category.module.clone(),
                    count,
                });
            }
        }

        tracing::info!(
            "Reassigned {} item(s) from '{}' to {:?} ({} failure(s))",
            report.total(),
            from_user_id,
            to_user_id,
            report.failures.len()
        );
        report
    }
}

/// Human-readable sentence describing what a user owns
pub fn summarize(dependencies: &UserDependencies) -> String {
    if !dependencies.has_items {
        return "This user has no assigned items.".to_string();
    }

    let parts: Vec<String> = dependencies
        .categories
        .iter()
        .map(|c| format!("{} {}", c.count, c.label.to_lowercase()))
        .collect();

    let listed = match parts.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
        None => String::new(),
    };

    format!("This user is assigned to {}.", listed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Record {
        id: String,
        name: String,
        owner: Option<String>,
    }

    fn record(id: &str, owner: Option<&str>) -> Record {
        Record {
            id: id.to_string(),
            name: format!("Record {}", id),
            owner: owner.map(str::to_string),
        }
    }

    struct MemorySource {
        records: Arc<Mutex<Vec<Record>>>,
        reassign_calls: Arc<AtomicUsize>,
        fail_on: Option<String>,
        reassignable: bool,
    }

    impl MemorySource {
        fn new(records: Vec<Record>) -> Self {
            Self {
                records: Arc::new(Mutex::new(records)),
                reassign_calls: Arc::new(AtomicUsize::new(0)),
                fail_on: None,
                reassignable: true,
            }
        }
    }

    #[async_trait]
    impl DependencySource for MemorySource {
        type Item = Record;

        async fn items(&self) -> Result<Vec<Record>, SourceError> {
            Ok(self.records.lock().unwrap().clone())
        }

        fn owner_id<'a>(&self, item: &'a Record) -> Option<&'a str> {
            item.owner.as_deref()
        }

        fn item_id(&self, item: &Record) -> String {
            item.id.clone()
        }

        fn item_name(&self, item: &Record) -> String {
            item.name.clone()
        }

        fn item_url(&self, item: &Record) -> Option<String> {
            Some(format!("/records/{}", item.id))
        }

        async fn reassign(&self, item_id: &str, to_user_id: Option<&str>) -> Result<(), SourceError> {
            self.reassign_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(item_id) {
                return Err(SourceError::Failed("write rejected".to_string()));
            }
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.id == item_id)
                .ok_or_else(|| SourceError::NotFound(item_id.to_string()))?;
            record.owner = to_user_id.map(str::to_string);
            Ok(())
        }

        fn can_reassign(&self) -> bool {
            self.reassignable
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl DependencySource for BrokenSource {
        type Item = Record;

        async fn items(&self) -> Result<Vec<Record>, SourceError> {
            Err(SourceError::Failed("store offline".to_string()))
        }

        fn owner_id<'a>(&self, item: &'a Record) -> Option<&'a str> {
            item.owner.as_deref()
        }

        fn item_id(&self, item: &Record) -> String {
            item.id.clone()
        }

        fn item_name(&self, item: &Record) -> String {
            item.name.clone()
        }

        async fn reassign(&self, _item_id: &str, _to_user_id: Option<&str>) -> Result<(), SourceError> {
            Err(SourceError::Failed("store offline".to_string()))
        }
    }

    /// Owns records through either of two fields
    struct SharedOwnershipSource(Vec<(Record, String)>);

    #[async_trait]
    impl DependencySource for SharedOwnershipSource {
        type Item = (Record, String);

        async fn items(&self) -> Result<Vec<(Record, String)>, SourceError> {
            Ok(self.0.clone())
        }

        fn owner_id<'a>(&self, item: &'a (Record, String)) -> Option<&'a str> {
            item.0.owner.as_deref()
        }

        fn is_owned_by(&self, item: &(Record, String), user_id: &str) -> bool {
            item.0.owner.as_deref() == Some(user_id) || item.1 == user_id
        }

        fn item_id(&self, item: &(Record, String)) -> String {
            item.0.id.clone()
        }

        fn item_name(&self, item: &(Record, String)) -> String {
            item.0.name.clone()
        }

        async fn reassign(&self, _item_id: &str, _to_user_id: Option<&str>) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn companies() -> ModuleDescriptor {
        ModuleDescriptor::new("companies", "Companies", "building", "account_manager_id")
    }

    fn projects() -> ModuleDescriptor {
        ModuleDescriptor::new("projects", "Projects", "folder", "project_manager_id")
    }

    #[tokio::test]
    async fn query_returns_one_category_per_module_with_matches() {
        let registry = DependencyRegistry::new();
        registry.register(
            companies(),
            MemorySource::new(vec![record("c1", Some("u1")), record("c2", Some("u2")), record("c3", Some("u1"))]),
        );
        registry.register(projects(), MemorySource::new(vec![record("p1", Some("u1"))]));
        registry.register(
            ModuleDescriptor::new("tasks", "Tasks", "check-square", "assignee_id"),
            MemorySource::new(vec![record("t1", Some("u2")), record("t2", None)]),
        );

        let deps = registry.query_dependencies("u1", "Dana").await;

        assert_eq!(deps.user_id, "u1");
        assert_eq!(deps.user_name, "Dana");
        assert!(deps.has_items);
        assert_eq!(deps.total_count, 3);
        let modules: Vec<&str> = deps.categories.iter().map(|c| c.module.as_str()).collect();
        assert_eq!(modules, vec!["companies", "projects"]);

        let companies = &deps.categories[0];
        assert_eq!(companies.count, 2);
        assert!(companies.can_reassign);
        assert_eq!(
            companies.items[0],
            DependencyItem {
                id: "c1".to_string(),
                name: "Record c1".to_string(),
                item_type: "Companies".to_string(),
                module: "companies".to_string(),
                url: Some("/records/c1".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn failing_module_is_skipped() {
        let registry = DependencyRegistry::new();
        registry.register(companies(), BrokenSource);
        registry.register(projects(), MemorySource::new(vec![record("p1", Some("u1"))]));

        let deps = registry.query_dependencies("u1", "Dana").await;

        assert_eq!(deps.categories.len(), 1);
        assert_eq!(deps.categories[0].module, "projects");
        assert_eq!(deps.total_count, 1);
    }

    #[tokio::test]
    async fn ownership_predicate_overrides_owner_id() {
        let registry = DependencyRegistry::new();
        registry.register(
            ModuleDescriptor::new("estimates", "Estimates", "calculator", "estimator_id"),
            SharedOwnershipSource(vec![
                (record("e1", Some("u2")), "u1".to_string()),
                (record("e2", Some("u2")), "u3".to_string()),
            ]),
        );

        let deps = registry.query_dependencies("u1", "Dana").await;
        assert_eq!(deps.total_count, 1);
        assert_eq!(deps.categories[0].items[0].id, "e1");
        assert_eq!(deps.categories[0].items[0].url, None);
    }

    #[tokio::test]
    async fn no_matches_means_no_items() {
        let registry = DependencyRegistry::new();
        registry.register(companies(), MemorySource::new(vec![record("c1", Some("u2"))]));

        let deps = registry.query_dependencies("u1", "Dana").await;
        assert!(!deps.has_items);
        assert_eq!(deps.total_count, 0);
        assert!(deps.categories.is_empty());
        assert_eq!(deps.summary(), "This user has no assigned items.");
    }

    #[tokio::test]
    async fn reassign_calls_each_item_once_and_counts_successes() {
        let registry = DependencyRegistry::new();
        let mut companies_source =
            MemorySource::new(vec![record("c1", Some("u1")), record("c2", Some("u1")), record("c3", Some("u1"))]);
        companies_source.fail_on = Some("c2".to_string());
        let company_calls = companies_source.reassign_calls.clone();
        let company_records = companies_source.records.clone();
        registry.register(companies(), companies_source);

        let projects_source = MemorySource::new(vec![record("p1", Some("u1"))]);
        let project_calls = projects_source.reassign_calls.clone();
        registry.register(projects(), projects_source);

        let deps = registry.query_dependencies("u1", "Dana").await;
        let report = registry.reassign("u1", Some("u9"), &deps.categories).await;

        assert_eq!(company_calls.load(Ordering::SeqCst), 3);
        assert_eq!(project_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            report.reassigned,
            vec![
                ReassignmentCount { module: "companies".to_string(), count: 2 },
                ReassignmentCount { module: "projects".to_string(), count: 1 },
            ]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item_id, "c2");
        assert_eq!(report.total(), 3);

        let owners: Vec<Option<String>> = company_records.lock().unwrap().iter().map(|r| r.owner.clone()).collect();
        assert_eq!(
            owners,
            vec![Some("u9".to_string()), Some("u1".to_string()), Some("u9".to_string())]
        );
    }

    #[tokio::test]
    async fn reassign_to_none_unassigns() {
        let registry = DependencyRegistry::new();
        let source = MemorySource::new(vec![record("c1", Some("u1"))]);
        let records = source.records.clone();
        registry.register(companies(), source);

        let deps = registry.query_dependencies("u1", "Dana").await;
        let report = registry.reassign("u1", None, &deps.categories).await;

        assert_eq!(report.total(), 1);
        assert_eq!(records.lock().unwrap()[0].owner, None);
    }

    #[tokio::test]
    async fn non_reassignable_and_unknown_categories_are_skipped() {
        let registry = DependencyRegistry::new();
        let mut locked = MemorySource::new(vec![record("c1", Some("u1"))]);
        locked.reassignable = false;
        let locked_calls = locked.reassign_calls.clone();
        registry.register(companies(), locked);

        let deps = registry.query_dependencies("u1", "Dana").await;
        assert!(!deps.categories[0].can_reassign);

        let mut categories = deps.categories.clone();
        categories.push(DependencyCategory {
            module: "invoices".to_string(),
            label: "Invoices".to_string(),
            icon: "receipt".to_string(),
            owner_field: "owner_id".to_string(),
            count: 1,
            can_reassign: true,
            items: vec![DependencyItem {
                id: "i1".to_string(),
                name: "Invoice 1".to_string(),
                item_type: "Invoices".to_string(),
                module: "invoices".to_string(),
                url: None,
            }],
        });

        let report = registry.reassign("u1", Some("u2"), &categories).await;
        assert!(report.reassigned.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(locked_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn register_replaces_in_place_and_notifies() {
        let registry = DependencyRegistry::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let listener = registry.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        registry.register(companies(), MemorySource::new(vec![]));
        registry.register(projects(), MemorySource::new(vec![]));
        registry.register(
            ModuleDescriptor::new("companies", "Clients", "briefcase", "account_manager_id"),
            MemorySource::new(vec![]),
        );

        let modules = registry.modules();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].label, "Clients");
        assert_eq!(modules[1].module, "projects");

        assert!(registry.unregister("projects"));
        assert!(!registry.unregister("projects"));
        assert!(!registry.contains("projects"));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                RegistryEvent::Registered("companies".to_string()),
                RegistryEvent::Registered("projects".to_string()),
                RegistryEvent::Registered("companies".to_string()),
                RegistryEvent::Unregistered("projects".to_string()),
            ]
        );

        assert!(registry.unsubscribe(listener));
        registry.register(projects(), MemorySource::new(vec![]));
        assert_eq!(events.lock().unwrap().len(), 4);
    }

    #[test]
    fn listener_may_read_registry_during_notification() {
        let registry = Arc::new(DependencyRegistry::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let (reg, counter) = (Arc::downgrade(&registry), seen.clone());
        registry.subscribe(move |_| {
            if let Some(reg) = reg.upgrade() {
                counter.store(reg.len(), Ordering::SeqCst);
            }
        });

        registry.register(companies(), MemorySource::new(vec![]));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    fn deps_with(categories: &[(&str, usize)]) -> UserDependencies {
        let categories: Vec<DependencyCategory> = categories
            .iter()
            .map(|(label, count)| DependencyCategory {
                module: label.to_lowercase(),
                label: label.to_string(),
                icon: String::new(),
                owner_field: "owner_id".to_string(),
                count: *count,
                can_reassign: true,
                items: Vec::new(),
            })
            .collect();
        let total_count = categories.iter().map(|c| c.count).sum();
        UserDependencies {
            user_id: "u1".to_string(),
            user_name: "Dana".to_string(),
            total_count,
            has_items: total_count > 0,
            categories,
        }
    }

    #[test]
    fn summarize_sentences() {
        assert_eq!(summarize(&deps_with(&[])), "This user has no assigned items.");
        assert_eq!(
            summarize(&deps_with(&[("Companies", 3)])),
            "This user is assigned to 3 companies."
        );
        assert_eq!(
            summarize(&deps_with(&[("Companies", 3), ("Projects", 2)])),
            "This user is assigned to 3 companies and 2 projects."
        );
        assert_eq!(
            summarize(&deps_with(&[("Companies", 3), ("Projects", 2), ("Tasks", 7)])),
            "This user is assigned to 3 companies, 2 projects and 7 tasks."
        );
    }
}
