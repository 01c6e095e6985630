/**
 * Routes Module
 * API route handlers
 */

pub mod auth;
pub mod bookings;
pub mod case_studies;
pub mod content;
pub mod health;
pub mod insights;
pub mod leads;
pub mod media;
pub mod pages;
pub mod resource;
pub mod rss;
pub mod services;
pub mod settings;
pub mod setup;
pub mod testimonials;
pub mod users;
