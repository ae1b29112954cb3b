//! File and directory names derived from prompt text.
//!
//! Neither name is meant to be collision free. Two prompts may share a job
//! directory, and the same prompt generated twice within one second by the same
//! provider produces the same artifact names.

use chrono::NaiveDateTime;

/// First 8 hex digits of the prompt's BLAKE3 hash.
pub fn fingerprint(prompt: &str) -> String {
    blake3::hash(prompt.as_bytes()).to_hex().as_str()[..8].to_string()
}

/// `{provider}_{YYYYMMDD_HHMMSS}_{fingerprint}_{index}.png`
pub fn artifact_filename(
    prompt: &str,
    provider: &str,
    timestamp: &NaiveDateTime,
    index: usize,
) -> String {
    format!(
        "{provider}_{}_{}_{index}.png",
        timestamp.format("%Y%m%d_%H%M%S"),
        fingerprint(prompt)
    )
}

/// `job_NNNN`, where `NNNN` is the prompt hash reduced modulo 10000.
pub fn job_dir_name(prompt: &str) -> String {
    let hash = blake3::hash(prompt.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    format!("job_{:04}", u64::from_le_bytes(head) % 10_000)
}
