//! Translation request orchestration.
//!
//! Validates a batch, marshals it into engine arguments, runs the direct or
//! pivoted entry point and unmarshals the responses into
//! [`TranslationResult`] records.
//!
//! Blank items are dropped before translation, so the output can be shorter
//! than the input. Options are matched to the surviving items:
//!
//! | options given | meaning |
//! |---|---|
//! | 1 | applies to every item |
//! | one per input item | entries for blank items are dropped with them |
//! | one per surviving item | used as-is |
//!
//! Any other count is an input error. Validation runs in a fixed order:
//! text, options, then model lookup, so a bad request never reaches the
//! engine.

use std::time::Instant;

use tracing::{debug, info};
use verto_core::{Result, TranslationOptions, TranslationResult, VertoError};
use verto_engine::{EngineResponse, ResponseOptions};

use crate::models::{ModelManager, RouteHandles};

/// Trimmed, non-blank items with their original positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedInput {
    /// Items to translate, trimmed.
    pub items: Vec<String>,
    /// Index in the original input of each item.
    pub positions: Vec<usize>,
    /// Length of the original input.
    pub original_len: usize,
}

/// Trim every item and drop the blank ones.
pub fn prepare_source_text(input: &[String]) -> Result<PreparedInput> {
    let (positions, items): (Vec<usize>, Vec<String>) = input
        .iter()
        .enumerate()
        .map(|(i, text)| (i, text.trim()))
        .filter(|(_, text)| !text.is_empty())
        .map(|(i, text)| (i, text.to_string()))
        .unzip();

    if items.is_empty() {
        return Err(VertoError::input("No text provided to translate"));
    }
    Ok(PreparedInput {
        items,
        positions,
        original_len: input.len(),
    })
}

/// One engine options record per surviving item.
pub fn prepare_response_options(
    options: &[TranslationOptions],
    input: &PreparedInput,
) -> Result<Vec<ResponseOptions>> {
    let wanted = input.items.len();
    let selected: Vec<TranslationOptions> = match options.len() {
        0 => return Err(VertoError::input("No Translation Options provided")),
        1 => vec![options[0]; wanted],
        n if n == wanted => options.to_vec(),
        n if n == input.original_len => input.positions.iter().map(|&i| options[i]).collect(),
        n => {
            return Err(VertoError::input(format!(
                "Expected {wanted} translation options, got {n}"
            )));
        }
    };
    Ok(selected.into_iter().map(ResponseOptions::from).collect())
}

/// Convert one engine response into the host record.
pub fn make_result(response: EngineResponse) -> TranslationResult {
    let mut result = TranslationResult {
        source: response.original_text,
        target: response.translated_text,
        ..TranslationResult::default()
    };
    for sentence in response.sentences {
        result.alignments.push(sentence.alignment);
        result.source_tokens.push(sentence.source_tokens);
        result.target_tokens.push(sentence.target_tokens);
    }
    result
}

/// Whitespace-separated words across the items.
pub fn word_count(items: &[String]) -> usize {
    items.iter().map(|item| item.split_whitespace().count()).sum()
}

/// Translate `input` from `from` to `to` with the models already loaded.
pub fn translate(
    models: &ModelManager,
    from: &str,
    to: &str,
    input: &[String],
    options: &[TranslationOptions],
) -> Result<Vec<TranslationResult>> {
    let prepared = prepare_source_text(input)?;
    let response_options = prepare_response_options(options, &prepared)?;
    let route = models.route(from, to)?;
    let handles = models.handles(&route)?;

    let words = word_count(&prepared.items);
    debug!(route = %route, blocks = prepared.items.len(), words, "translating");
    let start = Instant::now();

    let engine = models.engine();
    let responses = match handles {
        RouteHandles::Direct(model) => {
            engine.translate(model, &prepared.items, &response_options)?
        }
        RouteHandles::Pivot(first, second) => {
            engine.translate_via_pivoting(first, second, &prepared.items, &response_options)?
        }
    };
    if responses.len() != prepared.items.len() {
        return Err(VertoError::engine(format!(
            "engine returned {} responses for {} items",
            responses.len(),
            prepared.items.len()
        )));
    }

    let secs = start.elapsed().as_secs_f64();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let wps = if secs > 0.0 { (words as f64 / secs).round() as u64 } else { 0 };
    info!(route = %route, blocks = prepared.items.len(), words, secs, wps, "translation complete");

    Ok(responses.into_iter().map(make_result).collect())
}
