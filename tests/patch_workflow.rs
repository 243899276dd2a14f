//! End-to-end workflow tests: stage, patch, report.

use std::fs;
use std::process::Command;

use opensci_hotfix::{FileOutcome, PatchEngine};
use tempfile::TempDir;

/// A modeling file containing all five incompatible constructs.
const MODELING_WITH_EVERYTHING: &str = r#"# coding=utf-8
"""Opensci model definition."""
from typing import Callable

import torch
from torch import nn

from transformers.utils import LossKwargs


class OpensciRotaryEmbedding(nn.Module):
    def __init__(self, config, device=None):
        super().__init__()
        self.rope_type = "default"
        self.config = config
        self.rope_init_fn = ROPE_INIT_FUNCTIONS[self.rope_type]
        inv_freq, self.attention_scaling = self.rope_init_fn(self.config, device)
        self.register_buffer("inv_freq", inv_freq, persistent=False)

    @torch.no_grad()
    def forward(self, x, position_ids):
        inv_freq_expanded = self.inv_freq[None, :, None].float().expand(position_ids.shape[0], -1, 1)
        position_ids_expanded = position_ids[:, None, :].float()
        return inv_freq_expanded, position_ids_expanded


class OpensciAttention(nn.Module):
    def forward(self, hidden_states, **kwargs):
        attention_interface: Callable = eager_attention_forward
        if self.config._attn_implementation != "eager":
            attention_interface = ALL_ATTENTION_FUNCTIONS[self.config._attn_implementation]
        return attention_interface(self, hidden_states, **kwargs)


class OpensciForCausalLM(OpensciPreTrainedModel, LossKwargs):
    _tied_weights_keys = ["lm_head.weight"]
"#;

/// A modeling file containing none of the targeted constructs.
const MODELING_WITH_NOTHING: &str = r#"# coding=utf-8
"""Helper layers only."""
import torch
from torch import nn


class OpensciMLP(nn.Module):
    def forward(self, x):
        return self.down_proj(self.act_fn(self.gate_proj(x)) * self.up_proj(x))
"#;

/// Helper: create a model directory with one patchable and one clean file.
fn setup_model_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("open-sci-ref-1.7b");
    fs::create_dir(&model).unwrap();
    fs::write(model.join("modeling_opensci.py"), MODELING_WITH_EVERYTHING).unwrap();
    fs::write(model.join("modeling_plain.py"), MODELING_WITH_NOTHING).unwrap();
    fs::write(model.join("config.json"), "{\"model_type\": \"opensci\"}").unwrap();
    dir
}

#[test]
fn patches_one_file_and_skips_the_other() {
    let dir = setup_model_dir();
    let model = dir.path().join("open-sci-ref-1.7b");

    let report = PatchEngine::new().run(&model).unwrap();

    assert_eq!(report.fixed_dir, dir.path().join("open-sci-ref-1.7b_fixed"));
    assert_eq!(report.patched_count(), 1);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].name, "modeling_opensci.py");
    assert_eq!(report.files[0].outcome, FileOutcome::Patched);
    assert_eq!(report.files[1].name, "modeling_plain.py");
    assert_eq!(report.files[1].outcome, FileOutcome::Skipped);
}

#[test]
fn patched_file_contains_all_five_rewrites() {
    let dir = setup_model_dir();
    let model = dir.path().join("open-sci-ref-1.7b");

    let report = PatchEngine::new().run(&model).unwrap();
    let patched = fs::read_to_string(report.fixed_dir.join("modeling_opensci.py")).unwrap();

    // 1. Rename: zero occurrences of the old symbol remain.
    assert!(!patched.contains("LossKwargs"));
    assert!(patched.contains("TransformersKwargs"));
    // 2. ROPE fallback inlined.
    assert!(patched.contains("if self.rope_type in ROPE_INIT_FUNCTIONS:"));
    assert!(patched.contains("def _default_rope_init(config, device=None, **kwargs):"));
    // 3. Tied-weights mapping form.
    assert!(patched
        .contains("_tied_weights_keys = {\"lm_head.weight\": \"model.embed_tokens.weight\"}"));
    // 4. Inlined attention wrapper.
    assert!(patched.contains("def _sdpa_attention_no_gqa(*args, **kwargs):"));
    assert!(patched.contains("kwargs.pop(\"enable_gqa\", None)"));
    // 5. Re-init guard immediately before the untouched expansion line.
    assert!(patched.contains(
        "        if torch.count_nonzero(self.inv_freq) == 0:"
    ));
    assert!(patched.contains(
        "        inv_freq_expanded = self.inv_freq[None, :, None].float().expand(position_ids.shape[0], -1, 1)\n"
    ));
}

#[test]
fn skipped_file_is_byte_identical() {
    let dir = setup_model_dir();
    let model = dir.path().join("open-sci-ref-1.7b");

    let report = PatchEngine::new().run(&model).unwrap();
    let copied = fs::read_to_string(report.fixed_dir.join("modeling_plain.py")).unwrap();
    assert_eq!(copied, MODELING_WITH_NOTHING);
}

#[test]
fn source_directory_is_never_mutated() {
    let dir = setup_model_dir();
    let model = dir.path().join("open-sci-ref-1.7b");

    PatchEngine::new().run(&model).unwrap();

    assert_eq!(
        fs::read_to_string(model.join("modeling_opensci.py")).unwrap(),
        MODELING_WITH_EVERYTHING
    );
    assert_eq!(
        fs::read_to_string(model.join("modeling_plain.py")).unwrap(),
        MODELING_WITH_NOTHING
    );
}

#[test]
fn rerun_reflects_only_latest_source_content() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("model");
    fs::create_dir(&model).unwrap();
    fs::write(model.join("modeling_first.py"), MODELING_WITH_NOTHING).unwrap();

    let first = PatchEngine::new().run(&model).unwrap();
    assert!(first.fixed_dir.join("modeling_first.py").exists());

    fs::remove_file(model.join("modeling_first.py")).unwrap();
    fs::write(model.join("modeling_second.py"), MODELING_WITH_NOTHING).unwrap();

    let second = PatchEngine::new().run(&model).unwrap();
    assert!(!second.fixed_dir.join("modeling_first.py").exists());
    assert!(second.fixed_dir.join("modeling_second.py").exists());
}

#[test]
fn non_candidate_files_are_copied_untouched() {
    let dir = setup_model_dir();
    let model = dir.path().join("open-sci-ref-1.7b");

    let report = PatchEngine::new().run(&model).unwrap();
    assert_eq!(
        fs::read_to_string(report.fixed_dir.join("config.json")).unwrap(),
        "{\"model_type\": \"opensci\"}"
    );
    // config.json is not a candidate, so it never appears in the report.
    assert!(report.files.iter().all(|f| f.name != "config.json"));
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn cli_reports_each_file_and_summary() {
    let dir = setup_model_dir();
    let model = dir.path().join("open-sci-ref-1.7b");

    let output = run_cli(&["--src-dir", model.to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Copying '"));
    assert!(stdout.contains("Patched: modeling_opensci.py"));
    assert!(stdout.contains("Skipped (nothing to fix): modeling_plain.py"));
    assert!(stdout.contains("Done. 1 file(s) patched."));
    assert!(stdout.contains("open-sci-ref-1.7b_fixed"));
}

#[test]
fn cli_emits_json_report() {
    let dir = setup_model_dir();
    let model = dir.path().join("open-sci-ref-1.7b");

    let output = run_cli(&["--src-dir", model.to_str().unwrap(), "--json"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["files"][0]["name"], "modeling_opensci.py");
    assert_eq!(report["files"][0]["outcome"], "patched");
    assert_eq!(report["files"][1]["outcome"], "skipped");
}

#[test]
fn cli_fails_on_missing_source_dir() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-model");

    let output = run_cli(&["--src-dir", missing.to_str().unwrap()]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("model directory not found"));
    assert!(!missing.exists());
}
