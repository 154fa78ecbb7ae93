//! Call-site matching and key extraction.
//!
//! Walks a method's invocations with their computed abstract frames and
//! pulls out every string argument the analysis proved constant at a call
//! matching a configured pattern. A key referenced only through a
//! runtime-computed string is invisible here by design.

use crate::analysis::MethodFrames;
use crate::bytecode::descriptor;
use crate::bytecode::{InsnKind, InvokeInsn, MethodCode};

/// The built-in target: the message service the scanned code calls into.
pub const DEFAULT_SERVICE_OWNER: &str = "io/keylint/messages/MessageService";
pub const DEFAULT_SERVICE_METHODS: &[&str] = &["component", "raw", "contains"];

/// The conventionally always-relevant key literal.
pub const PREFIX_KEY: &str = "prefix";

/// One configured call target. Matched by structural equality on the
/// invoked owner and method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSitePattern {
    /// Internal name of the owning type, e.g. `app/util/Msg`.
    pub owner: String,
    pub method: String,
    /// Zero-based argument position that must hold the constant key.
    pub key_arg: usize,
}

impl CallSitePattern {
    pub fn new(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            key_arg: 0,
        }
    }

    fn matches(&self, invoke: &InvokeInsn) -> bool {
        self.owner == invoke.target.owner && self.method == invoke.target.name
    }
}

/// Extraction settings: the pattern table plus the required key prefix.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub patterns: Vec<CallSitePattern>,
    pub key_prefix: String,
}

impl ExtractorConfig {
    /// Built-in service patterns plus the cross product of the configured
    /// owner and method allow-lists. Owners may be given in dotted form.
    pub fn new(
        key_prefix: impl Into<String>,
        extra_owners: &[String],
        extra_methods: &[String],
    ) -> Self {
        let mut patterns: Vec<CallSitePattern> = DEFAULT_SERVICE_METHODS
            .iter()
            .map(|m| CallSitePattern::new(DEFAULT_SERVICE_OWNER, *m))
            .collect();
        for owner in extra_owners {
            let owner = owner.replace('.', "/");
            for method in extra_methods {
                patterns.push(CallSitePattern::new(owner.clone(), method.clone()));
            }
        }
        Self {
            patterns,
            key_prefix: key_prefix.into(),
        }
    }
}

/// A key proven constant at a matched call site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExtractedKey {
    pub key: String,
    /// Internal name of the class the usage was found in.
    pub class: String,
    /// Name of the enclosing method.
    pub method: String,
}

/// Extract all statically-known keys from one analyzed method.
pub fn extract_keys(
    class_name: &str,
    method_name: &str,
    code: &MethodCode,
    frames: &MethodFrames,
    config: &ExtractorConfig,
) -> Vec<ExtractedKey> {
    let mut out = Vec::new();
    for (index, insn) in code.insns.iter().enumerate() {
        let InsnKind::Invoke(invoke) = &insn.kind else {
            continue;
        };
        let Some(pattern) = config.patterns.iter().find(|p| p.matches(invoke)) else {
            continue;
        };
        let Some(raw) = constant_argument(invoke, pattern.key_arg, frames, index) else {
            continue;
        };
        if let Some(key) = accept_key(&raw, &config.key_prefix) {
            out.push(ExtractedKey {
                key,
                class: class_name.to_string(),
                method: method_name.to_string(),
            });
        }
    }
    out
}

/// Read the abstract value of the designated argument from the frame
/// computed for the invocation, if it is a string constant.
fn constant_argument(
    invoke: &InvokeInsn,
    key_arg: usize,
    frames: &MethodFrames,
    index: usize,
) -> Option<String> {
    let args = descriptor::argument_types(&invoke.target.descriptor).ok()?;
    let arg = args.get(key_arg)?;
    if !arg.is_string() {
        return None;
    }
    // Arguments sit on top of the stack in declaration order; the words of
    // every later argument lie above the key argument.
    let above: usize = args[key_arg + 1..].iter().map(|a| a.words).sum();
    let frame = frames.incoming(index)?;
    frame.peek(above).ok()?.as_constant().map(str::to_string)
}

/// The key-shape rule, kept exactly as the validation it replaces: trim,
/// reject path-like or oddly-charactered literals, then accept anything
/// that starts with the prefix, is the `"prefix"` literal, or contains a
/// hierarchy dot. Accepted keys are normalized onto the prefix.
fn accept_key(raw: &str, prefix: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !looks_like_message_key(trimmed, prefix) {
        return None;
    }
    if !prefix.is_empty() && trimmed.starts_with(prefix) {
        Some(trimmed.to_string())
    } else {
        Some(format!("{}{}", prefix, trimmed))
    }
}

fn looks_like_message_key(value: &str, prefix: &str) -> bool {
    if value.contains('/') {
        return false;
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return false;
    }
    if !prefix.is_empty() && value.starts_with(prefix) {
        return true;
    }
    value == PREFIX_KEY || value.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::bytecode::decoder::decode;
    use crate::bytecode::opcodes as op;
    use crate::bytecode::testutil::{PoolBuilder, method};

    fn run_extraction(
        code_bytes: &[u8],
        pb: &PoolBuilder,
        config: &ExtractorConfig,
    ) -> Vec<String> {
        let body = method(code_bytes);
        let code = decode(&body, &pb.pool).unwrap();
        let frames = analyze(&code).unwrap();
        extract_keys("app/Caller", "run", &code, &frames, config)
            .into_iter()
            .map(|e| e.key)
            .collect()
    }

    fn service_config() -> ExtractorConfig {
        ExtractorConfig::new("", &[], &[])
    }

    #[test]
    fn test_constant_key_at_builtin_pattern() {
        let mut pb = PoolBuilder::new();
        let key = pb.string("error.notfound");
        let call = pb.method_ref(
            DEFAULT_SERVICE_OWNER,
            "raw",
            "(Ljava/lang/String;)Ljava/lang/String;",
        );
        let keys = run_extraction(
            &[op::LDC, key as u8, op::INVOKESTATIC, 0, call as u8, op::POP, op::RETURN],
            &pb,
            &service_config(),
        );
        assert_eq!(keys, vec!["error.notfound".to_string()]);
    }

    #[test]
    fn test_non_pattern_call_is_ignored() {
        let mut pb = PoolBuilder::new();
        let key = pb.string("error.notfound");
        let call = pb.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
        let keys = run_extraction(
            &[op::LDC, key as u8, op::INVOKESTATIC, 0, call as u8, op::RETURN],
            &pb,
            &service_config(),
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn test_allow_listed_wrapper_matches() {
        let mut pb = PoolBuilder::new();
        let key = pb.string("menu.open");
        let call = pb.method_ref("app/util/Msg", "getMessage", "(Ljava/lang/String;)V");
        let config = ExtractorConfig::new(
            "",
            &["app.util.Msg".to_string()],
            &["getMessage".to_string()],
        );
        let keys = run_extraction(
            &[op::LDC, key as u8, op::INVOKESTATIC, 0, call as u8, op::RETURN],
            &pb,
            &config,
        );
        assert_eq!(keys, vec!["menu.open".to_string()]);
    }

    #[test]
    fn test_key_below_trailing_arguments() {
        let mut pb = PoolBuilder::new();
        let key = pb.string("fmt.count");
        // raw(String, long): the long's two words sit above the key.
        let call = pb.method_ref(DEFAULT_SERVICE_OWNER, "raw", "(Ljava/lang/String;J)V");
        let keys = run_extraction(
            &[
                op::LDC,
                key as u8,
                op::LCONST_0,
                op::INVOKESTATIC,
                0,
                call as u8,
                op::RETURN,
            ],
            &pb,
            &service_config(),
        );
        assert_eq!(keys, vec!["fmt.count".to_string()]);
    }

    #[test]
    fn test_non_constant_argument_extracts_nothing() {
        let mut pb = PoolBuilder::new();
        let call = pb.method_ref(DEFAULT_SERVICE_OWNER, "raw", "(Ljava/lang/String;)V");
        // aload_0 pushes an unknown reference.
        let keys = run_extraction(
            &[0x2a, op::INVOKESTATIC, 0, call as u8, op::RETURN],
            &pb,
            &service_config(),
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn test_first_argument_must_be_string() {
        let mut pb = PoolBuilder::new();
        let call = pb.method_ref(DEFAULT_SERVICE_OWNER, "raw", "(I)V");
        let keys = run_extraction(
            &[op::ICONST_M1, op::INVOKESTATIC, 0, call as u8, op::RETURN],
            &pb,
            &service_config(),
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn test_path_like_literal_rejected() {
        let mut pb = PoolBuilder::new();
        let key = pb.string("config/messages.yml");
        let call = pb.method_ref(DEFAULT_SERVICE_OWNER, "raw", "(Ljava/lang/String;)V");
        let keys = run_extraction(
            &[op::LDC, key as u8, op::INVOKESTATIC, 0, call as u8, op::RETURN],
            &pb,
            &service_config(),
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn test_key_shape_rule() {
        assert_eq!(accept_key("error.denied", ""), Some("error.denied".to_string()));
        assert_eq!(accept_key("prefix", ""), Some("prefix".to_string()));
        assert_eq!(accept_key("  error.denied  ", ""), Some("error.denied".to_string()));
        // Single word without a dot is not a key.
        assert_eq!(accept_key("hello", ""), None);
        assert_eq!(accept_key("", ""), None);
        assert_eq!(accept_key("   ", ""), None);
        assert_eq!(accept_key("a/b.c", ""), None);
        assert_eq!(accept_key("has space.x", ""), None);
    }

    #[test]
    fn test_prefix_normalization() {
        // A bare word that starts with the prefix is accepted as-is.
        assert_eq!(
            accept_key("myplugin.error", "myplugin."),
            Some("myplugin.error".to_string())
        );
        // A dotted key without the prefix gets it prepended.
        assert_eq!(
            accept_key("error.denied", "myplugin."),
            Some("myplugin.error.denied".to_string())
        );
        // The "prefix" literal is normalized onto the prefix too.
        assert_eq!(
            accept_key("prefix", "myplugin."),
            Some("myplugin.prefix".to_string())
        );
    }

    #[test]
    fn test_usage_site_is_recorded() {
        let mut pb = PoolBuilder::new();
        let key = pb.string("error.denied");
        let call = pb.method_ref(DEFAULT_SERVICE_OWNER, "component", "(Ljava/lang/String;)V");
        let body = method(&[op::LDC, key as u8, op::INVOKESTATIC, 0, call as u8, op::RETURN]);
        let code = decode(&body, &pb.pool).unwrap();
        let frames = analyze(&code).unwrap();
        let extracted = extract_keys("app/Caller", "handle", &code, &frames, &service_config());
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].class, "app/Caller");
        assert_eq!(extracted[0].method, "handle");
    }
}
