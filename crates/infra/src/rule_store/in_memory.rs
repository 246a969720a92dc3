use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use rolegate_auth::{
    AccessRoleRule, AdminError, BusinessElement, PermissionFlags, Role, RuleAdmin, RuleStore,
    StoreError,
};
use rolegate_core::{DomainError, ElementId, RoleId, RuleId};

#[derive(Debug, Default)]
struct Matrix {
    roles: HashMap<RoleId, Role>,
    elements: HashMap<ElementId, BusinessElement>,
    element_names: HashMap<String, ElementId>,
    rules: HashMap<RuleId, AccessRoleRule>,
    rule_index: HashMap<(RoleId, ElementId), RuleId>,
}

impl Matrix {
    fn rule_for(&self, role: RoleId, element: ElementId) -> Option<AccessRoleRule> {
        self.rule_index
            .get(&(role, element))
            .and_then(|id| self.rules.get(id))
            .cloned()
    }

    fn drop_rules_where(&mut self, pred: impl Fn(&AccessRoleRule) -> bool) {
        let doomed: Vec<RuleId> = self
            .rules
            .values()
            .filter(|r| pred(r))
            .map(|r| r.id)
            .collect();
        for id in doomed {
            if let Some(rule) = self.rules.remove(&id) {
                self.rule_index.remove(&(rule.role_id, rule.element_id));
            }
        }
    }
}

/// In-memory rule matrix for tests/dev.
///
/// One lock guards the whole matrix, so uniqueness checks and inserts are
/// atomic and a lookup sees a consistent snapshot.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    inner: RwLock<Matrix>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Matrix>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("rule matrix lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Matrix>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("rule matrix lock poisoned".to_string()))
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_element(&self, name: &str) -> Result<Option<BusinessElement>, StoreError> {
        let m = self.read()?;
        Ok(m.element_names
            .get(name)
            .and_then(|id| m.elements.get(id))
            .cloned())
    }

    async fn find_rule(
        &self,
        role: RoleId,
        element: ElementId,
    ) -> Result<Option<AccessRoleRule>, StoreError> {
        Ok(self.read()?.rule_for(role, element))
    }

    async fn lookup_rule(
        &self,
        role: RoleId,
        element_name: &str,
    ) -> Result<Option<AccessRoleRule>, StoreError> {
        let m = self.read()?;
        Ok(m.element_names
            .get(element_name)
            .and_then(|element| m.rule_for(role, *element)))
    }
}

#[async_trait]
impl RuleAdmin for InMemoryRuleStore {
    async fn create_role(&self, name: &str) -> Result<Role, AdminError> {
        let role = Role::new(name)?;
        let mut m = self.write()?;
        if m.roles.values().any(|r| r.name == role.name) {
            return Err(DomainError::conflict(format!("role '{}' already exists", role.name)).into());
        }
        m.roles.insert(role.id, role.clone());
        tracing::info!(role = %role.name, "role created");
        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, AdminError> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AdminError> {
        let mut roles: Vec<Role> = self.read()?.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), AdminError> {
        let mut m = self.write()?;
        let role = m
            .roles
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("role"))?;
        m.drop_rules_where(|r| r.role_id == id);
        tracing::info!(role = %role.name, "role deleted");
        Ok(())
    }

    async fn create_element(&self, name: &str) -> Result<BusinessElement, AdminError> {
        let element = BusinessElement::new(name)?;
        let mut m = self.write()?;
        if m.element_names.contains_key(&element.name) {
            return Err(DomainError::conflict(format!(
                "business element '{}' already exists",
                element.name
            ))
            .into());
        }
        m.element_names.insert(element.name.clone(), element.id);
        m.elements.insert(element.id, element.clone());
        tracing::info!(element = %element.name, "business element created");
        Ok(element)
    }

    async fn list_elements(&self) -> Result<Vec<BusinessElement>, AdminError> {
        let mut elements: Vec<BusinessElement> = self.read()?.elements.values().cloned().collect();
        elements.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(elements)
    }

    async fn delete_element(&self, id: ElementId) -> Result<(), AdminError> {
        let mut m = self.write()?;
        let element = m
            .elements
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("business element"))?;
        m.element_names.remove(&element.name);
        m.drop_rules_where(|r| r.element_id == id);
        tracing::info!(element = %element.name, "business element deleted");
        Ok(())
    }

    async fn grant(
        &self,
        role: RoleId,
        element: ElementId,
        flags: PermissionFlags,
    ) -> Result<AccessRoleRule, AdminError> {
        let mut m = self.write()?;
        if !m.roles.contains_key(&role) {
            return Err(DomainError::not_found("role").into());
        }
        if !m.elements.contains_key(&element) {
            return Err(DomainError::not_found("business element").into());
        }
        if m.rule_index.contains_key(&(role, element)) {
            return Err(DomainError::conflict("a rule already exists for this role and element").into());
        }

        let rule = AccessRoleRule::new(role, element, flags);
        m.rule_index.insert((role, element), rule.id);
        m.rules.insert(rule.id, rule.clone());
        tracing::info!(rule_id = %rule.id, role_id = %role, element_id = %element, "rule granted");
        Ok(rule)
    }

    async fn update_rule(
        &self,
        id: RuleId,
        flags: PermissionFlags,
    ) -> Result<AccessRoleRule, AdminError> {
        let mut m = self.write()?;
        let rule = m
            .rules
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("rule"))?;
        rule.flags = flags;
        tracing::info!(rule_id = %id, "rule updated");
        Ok(rule.clone())
    }

    async fn revoke(&self, id: RuleId) -> Result<(), AdminError> {
        let mut m = self.write()?;
        let rule = m
            .rules
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("rule"))?;
        m.rule_index.remove(&(rule.role_id, rule.element_id));
        tracing::info!(rule_id = %id, "rule revoked");
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<AccessRoleRule>, AdminError> {
        let mut rules: Vec<AccessRoleRule> = self.read()?.rules.values().cloned().collect();
        rules.sort_by_key(|r| r.id);
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rolegate_auth::{AccessEngine, Actor, Decision, Scope, Verb};
    use rolegate_core::UserId;

    use super::*;

    fn read_own() -> PermissionFlags {
        PermissionFlags {
            read_own: true,
            ..PermissionFlags::none()
        }
    }

    #[tokio::test]
    async fn lookup_by_element_name() {
        let store = InMemoryRuleStore::new();
        let role = store.create_role("editor").await.unwrap();
        let element = store.create_element("products").await.unwrap();
        let rule = store.grant(role.id, element.id, read_own()).await.unwrap();

        assert_eq!(store.lookup_rule(role.id, "products").await.unwrap(), Some(rule));
        assert_eq!(store.lookup_rule(role.id, "orders").await.unwrap(), None);
        assert_eq!(store.lookup_rule(RoleId::new(), "products").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let store = InMemoryRuleStore::new();
        store.create_role("editor").await.unwrap();
        store.create_element("products").await.unwrap();

        assert!(matches!(
            store.create_role(" editor ").await,
            Err(AdminError::Domain(DomainError::Conflict(_)))
        ));
        assert!(matches!(
            store.create_element("products").await,
            Err(AdminError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn at_most_one_rule_per_pair() {
        let store = InMemoryRuleStore::new();
        let role = store.create_role("editor").await.unwrap();
        let element = store.create_element("products").await.unwrap();
        store.grant(role.id, element.id, read_own()).await.unwrap();

        let second = store.grant(role.id, element.id, PermissionFlags::full()).await;
        assert!(matches!(second, Err(AdminError::Domain(DomainError::Conflict(_)))));
        assert_eq!(store.list_rules().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn grant_rejects_dangling_references() {
        let store = InMemoryRuleStore::new();
        let role = store.create_role("editor").await.unwrap();

        let result = store.grant(role.id, ElementId::new(), read_own()).await;
        assert!(matches!(result, Err(AdminError::Domain(DomainError::NotFound(_)))));
    }

    #[tokio::test]
    async fn deleting_role_or_element_cascades_to_rules() {
        let store = InMemoryRuleStore::new();
        let editor = store.create_role("editor").await.unwrap();
        let viewer = store.create_role("viewer").await.unwrap();
        let products = store.create_element("products").await.unwrap();
        let users = store.create_element("users").await.unwrap();
        store.grant(editor.id, products.id, read_own()).await.unwrap();
        store.grant(editor.id, users.id, read_own()).await.unwrap();
        store.grant(viewer.id, products.id, read_own()).await.unwrap();

        store.delete_role(editor.id).await.unwrap();
        assert_eq!(store.list_rules().await.unwrap().len(), 1);

        store.delete_element(products.id).await.unwrap();
        assert!(store.list_rules().await.unwrap().is_empty());
        assert_eq!(store.find_element("products").await.unwrap(), None);
    }

    #[tokio::test]
    async fn revoked_pair_can_be_granted_again() {
        let store = InMemoryRuleStore::new();
        let role = store.create_role("editor").await.unwrap();
        let element = store.create_element("products").await.unwrap();
        let rule = store.grant(role.id, element.id, read_own()).await.unwrap();

        store.revoke(rule.id).await.unwrap();
        assert!(matches!(
            store.revoke(rule.id).await,
            Err(AdminError::Domain(DomainError::NotFound(_)))
        ));
        assert!(store.grant(role.id, element.id, read_own()).await.is_ok());
    }

    #[tokio::test]
    async fn engine_sees_rule_updates_immediately() {
        let store = Arc::new(InMemoryRuleStore::new());
        let role = store.create_role("editor").await.unwrap();
        let element = store.create_element("products").await.unwrap();
        let rule = store.grant(role.id, element.id, read_own()).await.unwrap();

        let engine = AccessEngine::new(store.clone());
        let actor = Actor::authenticated(UserId::new(), Some(role.id));

        let before = engine.evaluate(&actor, "products", Verb::Read).await.unwrap();
        assert_eq!(before.scope(), Some(Scope::Own));

        store
            .update_rule(
                rule.id,
                PermissionFlags {
                    read_all: true,
                    ..PermissionFlags::none()
                },
            )
            .await
            .unwrap();
        let after = engine.evaluate(&actor, "products", Verb::Read).await.unwrap();
        assert_eq!(after.scope(), Some(Scope::All));

        store.delete_element(element.id).await.unwrap();
        let gone = engine.evaluate(&actor, "products", Verb::Read).await.unwrap();
        assert_eq!(gone, Decision::forbidden());
    }

    #[tokio::test]
    async fn listings_are_sorted_by_name() {
        let store = InMemoryRuleStore::new();
        store.create_role("viewer").await.unwrap();
        store.create_role("admin").await.unwrap();

        let names: Vec<String> = store
            .list_roles()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["admin", "viewer"]);
    }
}
