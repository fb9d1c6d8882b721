// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form payload as posted by the site.

use serde::{Deserialize, Serialize};

/// Decoded `POST /api/contact` body. Every field is a string and may be
/// absent, in which case it is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub company: String,
    pub service: String,
    pub budget: String,
    pub timeline: String,
    pub message: String,
    pub lang: String,
    pub privacy_accepted: String,

    // Budget estimator fields, only present when the visitor came from it
    pub budget_estimate: String,
    pub budget_project: String,
    pub budget_complexity: String,
    pub budget_features: String,
    pub budget_timeline: String,
    pub budget_duration: String,
    pub budget_comments: String,
}

impl ContactForm {
    /// Whether the submission carries estimator data.
    pub fn has_budget_estimate(&self) -> bool {
        !self.budget_estimate.is_empty()
    }
}
