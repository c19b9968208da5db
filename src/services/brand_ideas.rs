// src/services/brand_ideas.rs
use crate::models::{BrandIdea, Tone};
use rand::Rng;
use rand::seq::SliceRandom;

const NAMES: &[&str] = &["Solara Coffee", "NovaFit", "Lumen AI", "Breeze Bank", "CozyCart"];

const DESCRIPTIONS: &[&str] = &[
    "A modern, eco-friendly coffee brand for busy professionals.",
    "A smart fitness companion that makes workouts simple and fun.",
    "An AI assistant that streamlines creative workflows.",
    "A digital-first, fee-free bank with personality.",
    "A delightful shopping app focused on curated essentials.",
];

const VIBES: &[&str] = &[
    "minimalist, warm, friendly",
    "bold, energetic, confident",
    "clean, professional, trustworthy",
    "playful, modern, vibrant",
];

/// Draws a starter brief for the input form.
pub fn random_brand_idea<R: Rng + ?Sized>(rng: &mut R) -> BrandIdea {
    let pick = |rng: &mut R, items: &[&str]| items.choose(rng).copied().unwrap_or_default().to_string();
    BrandIdea {
        name: pick(rng, NAMES),
        description: pick(rng, DESCRIPTIONS),
        keywords: pick(rng, VIBES),
        tone: Tone::Friendly,
    }
}
