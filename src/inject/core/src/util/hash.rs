use std::hash::BuildHasherDefault;

pub type FxHashBuilder = BuildHasherDefault<fxhash::FxHasher>;
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, FxHashBuilder>;
