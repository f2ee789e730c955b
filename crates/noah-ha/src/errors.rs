// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Noah Optimizer.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HaError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Authentication failed, check the Home Assistant token")]
    AuthenticationFailed,

    #[error("Home Assistant API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Service call {service} failed: {reason}")]
    ServiceCallFailed { service: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type HaResult<T> = std::result::Result<T, HaError>;
