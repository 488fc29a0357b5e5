//! The intrinsic-to-libcall table.
//!
//! The table is process-wide and populated once on first lookup. Intrinsic
//! names carry a type suffix (`sqrt.f64`, `memcpy.i64`); the mapped libcall
//! is the plain C symbol implementing the same semantics.

use std::sync::OnceLock;

use rustc_hash::{FxHashMap, FxHashSet};

/// Math intrinsics with `f32`/`f64` variants: (base, f32 libcall, f64
/// libcall).
const MATH_LIBCALLS: &[(&str, &str, &str)] = &[
    ("sqrt", "sqrtf", "sqrt"),
    ("sin", "sinf", "sin"),
    ("cos", "cosf", "cos"),
    ("tan", "tanf", "tan"),
    ("exp", "expf", "exp"),
    ("exp2", "exp2f", "exp2"),
    ("log", "logf", "log"),
    ("log2", "log2f", "log2"),
    ("log10", "log10f", "log10"),
    ("pow", "powf", "pow"),
    ("fma", "fmaf", "fma"),
    ("fabs", "fabsf", "fabs"),
    ("floor", "floorf", "floor"),
    ("ceil", "ceilf", "ceil"),
    ("trunc", "truncf", "trunc"),
    ("rint", "rintf", "rint"),
    ("nearbyint", "nearbyintf", "nearbyint"),
    ("round", "roundf", "round"),
    ("copysign", "copysignf", "copysign"),
    ("minnum", "fminf", "fmin"),
    ("maxnum", "fmaxf", "fmax"),
];

/// Memory intrinsics with pointer-sized length variants.
const MEM_LIBCALLS: &[(&str, &str)] = &[
    ("memcpy", "memcpy"),
    ("memmove", "memmove"),
    ("memset", "memset"),
];

/// Intrinsics that are always expanded inline by the code generator and
/// must never be rewritten into calls.
const ALWAYS_INLINED: &[&str] = &[
    "stacksave",
    "stackrestore",
    "expect",
    "assume",
    "prefetch",
    "donothing",
    "lifetime.start",
    "lifetime.end",
    "va_start",
    "va_end",
    "frameaddress",
    "returnaddress",
];

static LIBCALLS: OnceLock<FxHashMap<String, &'static str>> = OnceLock::new();
static INLINED: OnceLock<FxHashSet<&'static str>> = OnceLock::new();

fn libcall_table() -> &'static FxHashMap<String, &'static str> {
    LIBCALLS.get_or_init(|| {
        let mut table = FxHashMap::default();
        for (base, f32_call, f64_call) in MATH_LIBCALLS {
            table.insert(format!("{base}.f32"), *f32_call);
            table.insert(format!("{base}.f64"), *f64_call);
        }
        for (base, call) in MEM_LIBCALLS {
            table.insert(format!("{base}.i32"), *call);
            table.insert(format!("{base}.i64"), *call);
        }
        table
    })
}

/// The libcall implementing `intrinsic`, if one is known.
pub fn libcall_for(intrinsic: &str) -> Option<&'static str> {
    libcall_table().get(intrinsic).copied()
}

/// Returns `true` if `intrinsic` is on the always-inline list and must be
/// left alone by lowering.
pub fn is_always_inlined(intrinsic: &str) -> bool {
    INLINED
        .get_or_init(|| ALWAYS_INLINED.iter().copied().collect())
        .contains(intrinsic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_width_selects_libcall() {
        assert_eq!(libcall_for("sqrt.f32"), Some("sqrtf"));
        assert_eq!(libcall_for("sqrt.f64"), Some("sqrt"));
        assert_eq!(libcall_for("memcpy.i64"), Some("memcpy"));
    }

    #[test]
    fn unknown_intrinsics_have_no_mapping() {
        assert_eq!(libcall_for("ctpop.i64"), None);
    }

    #[test]
    fn stack_intrinsics_stay_inline() {
        assert!(is_always_inlined("stacksave"));
        assert!(is_always_inlined("stackrestore"));
        assert!(!is_always_inlined("sqrt.f64"));
    }
}
