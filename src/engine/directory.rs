//! Spaces and accounts: the lookup tables reservations point into.
//! Spaces are deactivated, never deleted.

use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::policy::{self, Actor};
use super::{Engine, EngineError, Entity, SpaceFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpace {
    pub id: Ulid,
    pub name: String,
    pub capacity: u32,
    pub description: String,
    pub category: Category,
    pub tv: bool,
    pub projector: bool,
    pub air_conditioning: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpacePatch {
    pub name: Option<String>,
    pub capacity: Option<u32>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub active: Option<bool>,
    pub tv: Option<bool>,
    pub projector: Option<bool>,
    pub air_conditioning: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidInput("name must not be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("name too long"));
    }
    Ok(())
}

fn validate_capacity(capacity: u32) -> Result<(), EngineError> {
    if capacity == 0 {
        return Err(EngineError::InvalidInput("capacity must be positive".into()));
    }
    if capacity > MAX_CAPACITY {
        return Err(EngineError::LimitExceeded("capacity too large"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), EngineError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(EngineError::LimitExceeded("description too long"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), EngineError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(EngineError::LimitExceeded("email too long"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) => {
            Ok(())
        }
        _ => Err(EngineError::InvalidInput(format!("malformed email: {email:?}"))),
    }
}

impl Engine {
    pub async fn create_space(&self, actor: &Actor, new: NewSpace) -> Result<Space, EngineError> {
        policy::require_admin(actor)?;
        validate_name(&new.name)?;
        validate_capacity(new.capacity)?;
        validate_description(&new.description)?;

        let _directory = self.directory_lock.lock().await;
        if self.spaces.len() >= MAX_SPACES_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many spaces"));
        }
        if self.spaces.contains_key(&new.id) {
            return Err(EngineError::AlreadyExists(new.id));
        }

        let event = Event::SpaceCreated {
            id: new.id,
            name: new.name,
            capacity: new.capacity,
            description: new.description,
            category: new.category,
            tv: new.tv,
            projector: new.projector,
            air_conditioning: new.air_conditioning,
        };
        self.persist_directory(&event).await?;
        tracing::info!("space {} created", new.id);
        self.get_space(&new.id).await
    }

    /// Partial update; `active: Some(false)` deactivates. Existing
    /// reservations on a deactivated space are left as they are.
    pub async fn update_space(&self, actor: &Actor, id: Ulid, patch: SpacePatch) -> Result<Space, EngineError> {
        policy::require_admin(actor)?;
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(capacity) = patch.capacity {
            validate_capacity(capacity)?;
        }
        if let Some(description) = &patch.description {
            validate_description(description)?;
        }

        let st = self.space_state(&id).ok_or(EngineError::NotFound(Entity::Space, id))?;
        let mut guard = st.write().await;
        let current = &guard.space;
        let event = Event::SpaceUpdated {
            id,
            name: patch.name.unwrap_or_else(|| current.name.clone()),
            capacity: patch.capacity.unwrap_or(current.capacity),
            description: patch.description.unwrap_or_else(|| current.description.clone()),
            category: patch.category.unwrap_or(current.category),
            active: patch.active.unwrap_or(current.active),
            tv: patch.tv.unwrap_or(current.tv),
            projector: patch.projector.unwrap_or(current.projector),
            air_conditioning: patch.air_conditioning.unwrap_or(current.air_conditioning),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(guard.space.clone())
    }

    pub async fn get_space(&self, id: &Ulid) -> Result<Space, EngineError> {
        let st = self.space_state(id).ok_or(EngineError::NotFound(Entity::Space, *id))?;
        let guard = st.read().await;
        Ok(guard.space.clone())
    }

    /// Every authenticated actor may browse spaces.
    pub async fn list_spaces(&self, filter: &SpaceFilter) -> Vec<Space> {
        let states: Vec<_> = self.spaces.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for st in states {
            let guard = st.read().await;
            if filter.matches(&guard.space) {
                out.push(guard.space.clone());
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        out
    }

    pub async fn create_account(&self, actor: &Actor, new: NewAccount) -> Result<Account, EngineError> {
        policy::require_admin(actor)?;
        validate_name(&new.name)?;
        validate_email(&new.email)?;

        let _directory = self.directory_lock.lock().await;
        if self.accounts.len() >= MAX_ACCOUNTS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many accounts"));
        }
        if self.accounts.contains_key(&new.id) {
            return Err(EngineError::AlreadyExists(new.id));
        }
        if self.emails.contains_key(&new.email.to_lowercase()) {
            return Err(EngineError::EmailTaken(new.email));
        }

        let event = Event::AccountCreated {
            id: new.id,
            name: new.name,
            email: new.email,
            role: new.role,
            created_at: now_ms(),
        };
        self.persist_directory(&event).await?;
        tracing::info!("account {} created", new.id);
        self.lookup_account(&new.id)
    }

    pub async fn update_account(&self, actor: &Actor, id: Ulid, patch: AccountPatch) -> Result<Account, EngineError> {
        policy::require_admin(actor)?;
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }

        let _directory = self.directory_lock.lock().await;
        let current = self.lookup_account(&id)?;
        if let Some(email) = &patch.email
            && let Some(owner) = self.emails.get(&email.to_lowercase())
            && *owner != id
        {
            return Err(EngineError::EmailTaken(email.clone()));
        }

        let event = Event::AccountUpdated {
            id,
            name: patch.name.unwrap_or(current.name),
            email: patch.email.unwrap_or(current.email),
            role: patch.role.unwrap_or(current.role),
            active: patch.active.unwrap_or(current.active),
        };
        self.persist_directory(&event).await?;
        self.lookup_account(&id)
    }

    /// Admins see any account; everyone else only their own.
    pub fn get_account(&self, actor: &Actor, id: &Ulid) -> Result<Account, EngineError> {
        if !actor.is_admin() && actor.account_id() != Some(*id) {
            return Err(EngineError::Forbidden("account belongs to someone else"));
        }
        self.lookup_account(id)
    }

    pub fn list_accounts(&self, actor: &Actor) -> Result<Vec<Account>, EngineError> {
        policy::require_admin(actor)?;
        let mut out: Vec<Account> = self.accounts.iter().map(|e| e.value().clone()).collect();
        out.sort_by_key(|a| (a.created_at, a.id));
        Ok(out)
    }

    pub(super) fn lookup_account(&self, id: &Ulid) -> Result<Account, EngineError> {
        self.accounts
            .get(id)
            .map(|a| a.value().clone())
            .ok_or(EngineError::NotFound(Entity::Account, *id))
    }

    /// Resolve a connection login (an account id or its email) to the
    /// actor requests will run as. Unknown and inactive accounts are refused.
    pub fn actor_for_login(&self, login: &str) -> Result<Actor, EngineError> {
        let id = match Ulid::from_string(login) {
            Ok(id) => id,
            Err(_) => *self
                .emails
                .get(&login.to_lowercase())
                .ok_or(EngineError::Forbidden("unknown login"))?,
        };
        let account = self
            .accounts
            .get(&id)
            .ok_or(EngineError::Forbidden("unknown login"))?;
        if !account.active {
            return Err(EngineError::Forbidden("account is inactive"));
        }
        Ok(Actor::from_account(&account))
    }
}
