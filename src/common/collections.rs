pub use std::collections::{BTreeMap, BTreeSet};

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
