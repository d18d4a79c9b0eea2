//! Cached per-node metadata.
//!
//! A closed set of optional fields instead of an open string map. Merging
//! keeps partial-update semantics: a field left `None` in the newer value
//! does not erase the older one.

use std::fmt;

/// Facts a collector records about a node for the memo rewrite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeMetadata {
    /// Name used as the positional identity key.
    pub call_name: Option<String>,
    /// The function or call carries a receiver (`this`) parameter.
    pub has_receiver: Option<bool>,
    pub is_setter: Option<bool>,
    pub is_getter: Option<bool>,
    /// Entry point that supplies its own memo context; the body is kept.
    pub has_memo_entry: Option<bool>,
    /// Intrinsic function; only intrinsic calls in the body are rewritten.
    pub has_memo_intrinsic: Option<bool>,
    /// Parameter annotated to be excluded from memoization.
    pub has_memo_skip: Option<bool>,
    /// Leave function types as written.
    pub forbid_type_rewrite: Option<bool>,
    /// The node sits inside a type argument list.
    pub is_within_type_params: Option<bool>,
    /// Run the internals transformer over the function body.
    pub internals_transformer: Option<bool>,
}

impl NodeMetadata {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == NodeMetadata::default()
    }

    /// Overlay `newer` on `self`. Fields set in `newer` win.
    pub fn merge(&mut self, newer: &NodeMetadata) {
        overlay(&mut self.call_name, newer.call_name.as_ref());
        overlay(&mut self.has_receiver, newer.has_receiver.as_ref());
        overlay(&mut self.is_setter, newer.is_setter.as_ref());
        overlay(&mut self.is_getter, newer.is_getter.as_ref());
        overlay(&mut self.has_memo_entry, newer.has_memo_entry.as_ref());
        overlay(&mut self.has_memo_intrinsic, newer.has_memo_intrinsic.as_ref());
        overlay(&mut self.has_memo_skip, newer.has_memo_skip.as_ref());
        overlay(
            &mut self.forbid_type_rewrite,
            newer.forbid_type_rewrite.as_ref(),
        );
        overlay(
            &mut self.is_within_type_params,
            newer.is_within_type_params.as_ref(),
        );
        overlay(
            &mut self.internals_transformer,
            newer.internals_transformer.as_ref(),
        );
    }

    /// `self` overlaid with `newer`, without touching either.
    #[must_use]
    pub fn merged(&self, newer: &NodeMetadata) -> NodeMetadata {
        let mut out = self.clone();
        out.merge(newer);
        out
    }
}

fn overlay<T: Clone>(slot: &mut Option<T>, newer: Option<&T>) {
    if let Some(value) = newer {
        *slot = Some(value.clone());
    }
}

/// Compact `{key: value, ..}` rendering of the set fields, for diagnostics.
impl fmt::Display for NodeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            ("hasReceiver", self.has_receiver),
            ("isSetter", self.is_setter),
            ("isGetter", self.is_getter),
            ("hasMemoEntry", self.has_memo_entry),
            ("hasMemoIntrinsic", self.has_memo_intrinsic),
            ("hasMemoSkip", self.has_memo_skip),
            ("forbidTypeRewrite", self.forbid_type_rewrite),
            ("isWithinTypeParams", self.is_within_type_params),
            ("internalsTransformer", self.internals_transformer),
        ];
        f.write_str("{")?;
        let mut first = true;
        if let Some(name) = &self.call_name {
            write!(f, "callName: {name:?}")?;
            first = false;
        }
        for (key, value) in flags {
            if let Some(value) = value {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: {value}")?;
                first = false;
            }
        }
        f.write_str("}")
    }
}
