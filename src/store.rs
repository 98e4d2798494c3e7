// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user store.
//!
//! Holds user records for the lifetime of the process. Shared through
//! `AppState` behind a `tokio::sync::RwLock`.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{CreateUserRequest, UpdateUserRequest, User, UserRole};

#[derive(Default)]
pub struct InMemoryStore {
    users: HashMap<String, User>,
    /// Insertion order, oldest first.
    order: Vec<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All users, most recently created first.
    pub fn list_users(&self) -> Vec<User> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.users.get(id))
            .cloned()
            .collect()
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).cloned()
    }

    pub fn create_user(&mut self, request: CreateUserRequest) -> Result<User, ApiError> {
        let id = Uuid::new_v4().to_string();
        self.insert_user(id, request.name, request.email, request.role)
    }

    /// Insert a user with a caller-chosen id. Used for seeding.
    pub fn insert_user(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Result<User, ApiError> {
        let id = id.into();
        let email = email.into();

        if self.users.contains_key(&id) {
            return Err(ApiError::conflict("User id already exists"));
        }
        self.ensure_email_free(&email, None)?;

        let now = Utc::now();
        let user = User {
            id: id.clone(),
            name: name.into(),
            email,
            role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id.clone(), user.clone());
        self.order.push(id);
        Ok(user)
    }

    pub fn update_user(&mut self, user_id: &str, request: UpdateUserRequest) -> Result<User, ApiError> {
        if !self.users.contains_key(user_id) {
            return Err(ApiError::not_found("User not found"));
        }
        if let Some(email) = &request.email {
            self.ensure_email_free(email, Some(user_id))?;
        }

        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if let Some(name) = request.name {
            user.name = name;
        }
        if let Some(email) = request.email {
            user.email = email;
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    pub fn delete_user(&mut self, user_id: &str) -> Result<(), ApiError> {
        if self.users.remove(user_id).is_some() {
            self.order.retain(|id| id != user_id);
            Ok(())
        } else {
            Err(ApiError::not_found("User not found"))
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn ensure_email_free(&self, email: &str, except: Option<&str>) -> Result<(), ApiError> {
        let taken = self
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id.as_str()) != except);
        if taken {
            Err(ApiError::conflict("Email already in use"))
        } else {
            Ok(())
        }
    }
}
