use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::{KvError, Result, Value};

/// Number of logical databases.
pub(super) const DATABASES: usize = 16;

/// Milliseconds since the Unix epoch.
pub(super) fn now_ms() -> i64 {
    to_unix_ms(SystemTime::now())
}

pub(super) fn to_unix_ms(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

pub(super) fn wrong_type() -> KvError {
    KvError::Store("WRONGTYPE Operation against a key holding the wrong kind of value".to_owned())
}

pub(super) fn not_integer() -> KvError {
    KvError::Store("ERR value is not an integer or out of range".to_owned())
}

pub(super) fn not_float() -> KvError {
    KvError::Store("ERR value is not a valid float".to_owned())
}

pub(super) fn no_such_key() -> KvError {
    KvError::Store("ERR no such key".to_owned())
}

pub(super) fn wrong_args(command: &str) -> KvError {
    KvError::Store(format!(
        "ERR wrong number of arguments for '{}' command",
        command.to_ascii_lowercase()
    ))
}

/// Renders an argument the way it would travel on the wire.
pub(super) fn encode(value: &Value) -> Vec<u8> {
    match value {
        Value::Bytes(b) => b.clone(),
        other => other.to_string().into_bytes(),
    }
}

pub(super) fn parse_i64(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(not_integer)
}

pub(super) fn parse_f64(bytes: &[u8]) -> Result<f64> {
    Value::bulk(bytes.to_vec())
        .as_f64()
        .ok()
        .filter(|f| !f.is_nan())
        .ok_or_else(not_float)
}

/// Resolves a possibly negative `[start, stop]` range against `len`.
///
/// Returns `None` when the range is empty.
pub(super) fn resolve_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[derive(Debug, Clone)]
pub(super) enum Data {
    Str(Vec<u8>),
    List(VecDeque<Vec<u8>>),
    Hash(HashMap<String, Vec<u8>>),
    Set(HashSet<Vec<u8>>),
    ZSet(HashMap<Vec<u8>, f64>),
}

impl Data {
    pub(super) fn type_name(&self) -> &'static str {
        match self {
            Data::Str(_) => "string",
            Data::List(_) => "list",
            Data::Hash(_) => "hash",
            Data::Set(_) => "set",
            Data::ZSet(_) => "zset",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Data::Str(_) => false,
            Data::List(l) => l.is_empty(),
            Data::Hash(h) => h.is_empty(),
            Data::Set(s) => s.is_empty(),
            Data::ZSet(z) => z.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct Entry {
    pub data: Data,
    /// Absolute expiry, Unix milliseconds.
    pub expires_at: Option<i64>,
}

impl Entry {
    pub(super) fn new(data: Data) -> Self {
        Entry {
            data,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

macro_rules! typed_access {
    ($get:ident, $get_or_create:ident, $variant:ident, $ty:ty) => {
        pub(super) fn $get(&mut self, key: &str) -> Result<Option<&mut $ty>> {
            match self.live(key) {
                None => Ok(None),
                Some(Entry {
                    data: Data::$variant(inner),
                    ..
                }) => Ok(Some(inner)),
                Some(_) => Err(wrong_type()),
            }
        }

        pub(super) fn $get_or_create(&mut self, key: &str) -> Result<&mut $ty> {
            if self.live(key).is_none() {
                self.entries
                    .insert(key.to_owned(), Entry::new(Data::$variant(Default::default())));
            }
            match self.entries.get_mut(key) {
                Some(Entry {
                    data: Data::$variant(inner),
                    ..
                }) => Ok(inner),
                _ => Err(wrong_type()),
            }
        }
    };
}

/// One logical database. Expired keys are dropped lazily on access.
#[derive(Debug, Default)]
pub(super) struct Keyspace {
    entries: HashMap<String, Entry>,
}

impl Keyspace {
    pub(super) fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let now = now_ms();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    pub(super) fn contains(&mut self, key: &str) -> bool {
        self.live(key).is_some()
    }

    pub(super) fn remove(&mut self, key: &str) -> Option<Entry> {
        self.live(key)?;
        self.entries.remove(key)
    }

    pub(super) fn insert(&mut self, key: String, entry: Entry) {
        self.entries.insert(key, entry);
    }

    /// Removes `key` if it holds an emptied collection.
    pub(super) fn drop_if_empty(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(|e| e.data.is_empty()) {
            self.entries.remove(key);
        }
    }

    fn purge(&mut self) {
        let now = now_ms();
        self.entries.retain(|_, e| !e.is_expired(now));
    }

    pub(super) fn keys(&mut self) -> Vec<String> {
        self.purge();
        self.entries.keys().cloned().collect()
    }

    pub(super) fn len(&mut self) -> usize {
        self.purge();
        self.entries.len()
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(super) fn string(&mut self, key: &str) -> Result<Option<&mut Vec<u8>>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry {
                data: Data::Str(s), ..
            }) => Ok(Some(s)),
            Some(_) => Err(wrong_type()),
        }
    }

    /// Stores a string value, dropping any previous expiry.
    pub(super) fn set_string(&mut self, key: &str, value: Vec<u8>) {
        self.entries
            .insert(key.to_owned(), Entry::new(Data::Str(value)));
    }

    typed_access!(list, list_or_create, List, VecDeque<Vec<u8>>);
    typed_access!(hash, hash_or_create, Hash, HashMap<String, Vec<u8>>);
    typed_access!(set, set_or_create, Set, HashSet<Vec<u8>>);
    typed_access!(zset, zset_or_create, ZSet, HashMap<Vec<u8>, f64>);
}

/// The shared keyspace of all databases.
///
/// A single mutex guards every database; `pushed` wakes blocked list pops.
pub(super) struct Store {
    dbs: Mutex<Vec<Keyspace>>,
    pushed: Condvar,
}

impl Store {
    pub(super) fn new() -> Self {
        Store {
            dbs: Mutex::new((0..DATABASES).map(|_| Keyspace::default()).collect()),
            pushed: Condvar::new(),
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, Vec<Keyspace>> {
        self.dbs.lock()
    }

    /// Wakes every caller blocked in [`Store::wait`].
    pub(super) fn notify_pushed(&self) {
        self.pushed.notify_all();
    }

    pub(super) fn wait(&self, guard: &mut MutexGuard<'_, Vec<Keyspace>>, timeout: Duration) {
        self.pushed.wait_for(guard, timeout);
    }
}

/// Glob-style matching with `*`, `?`, `[...]`, `[^...]` and `\` escapes.
pub(super) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_at(&pattern, &text)
}

// Backtracks only to the most recent `*`, so matching stays linear in
// pattern times text.
fn glob_match_at(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if pattern.get(p) == Some(&'*') {
            p += 1;
            star = Some((p, t));
            continue;
        }
        if let Some(width) = match_token(&pattern[p..], text[t]) {
            p += width;
            t += 1;
            continue;
        }
        match star {
            Some((resume, consumed)) => {
                p = resume;
                t = consumed + 1;
                star = Some((resume, t));
            }
            None => return false,
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches the leading non-star token of `pattern` against `c`, returning
/// the token width on success.
fn match_token(pattern: &[char], c: char) -> Option<usize> {
    match *pattern.first()? {
        '?' => Some(1),
        '[' => match match_class(&pattern[1..], c) {
            Some((matched, after)) => matched.then_some(pattern.len() - after.len()),
            None => (c == '[').then_some(1),
        },
        '\\' if pattern.len() > 1 => (pattern[1] == c).then_some(2),
        literal => (literal == c).then_some(1),
    }
}

/// Matches `c` against a `[...]` class whose body starts at `class`.
///
/// Returns whether it matched and the pattern after the closing `]`, or
/// `None` if the class is unterminated.
fn match_class(class: &[char], c: char) -> Option<(bool, &[char])> {
    let (negate, mut i) = match class.first() {
        Some('^') => (true, 1),
        _ => (false, 0),
    };
    let mut matched = false;
    while i < class.len() {
        match class[i] {
            ']' => return Some((matched != negate, &class[i + 1..])),
            '\\' if i + 1 < class.len() => {
                matched |= class[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < class.len() && class[i + 1] == '-' && class[i + 2] != ']' => {
                let hi = class[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= (lo..=hi).contains(&c);
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_patterns() {
        assert!(glob_match("h?llo", "hello"));
        assert!(glob_match("h*llo", "hllo"));
        assert!(glob_match("h*llo", "heeeello"));
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[ae]llo", "hillo"));
        assert!(glob_match("h[^e]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("h[a-b]llo", "hbllo"));
        assert!(glob_match("news.\\*", "news.*"));
        assert!(!glob_match("news.\\*", "news.sport"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("a", "ab"));
        assert!(glob_match("*a*b", "xxaxxb"));
        assert!(!glob_match("*a*b", "xxbxxa"));
    }

    #[test]
    fn many_stars_do_not_backtrack_exponentially() {
        let text = "a".repeat(40);
        let start = std::time::Instant::now();
        assert!(!glob_match("*a*a*a*a*a*a*a*b", &text));
        assert!(glob_match("*a*a*a*a*a*a*a*", &text));
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn ranges_clamp_like_the_store() {
        assert_eq!(resolve_range(0, -1, 5), Some((0, 4)));
        assert_eq!(resolve_range(-2, -1, 5), Some((3, 4)));
        assert_eq!(resolve_range(1, 100, 5), Some((1, 4)));
        assert_eq!(resolve_range(-100, 1, 5), Some((0, 1)));
        assert_eq!(resolve_range(3, 1, 5), None);
        assert_eq!(resolve_range(0, -1, 0), None);
    }

    #[test]
    fn expired_keys_disappear() {
        let mut ks = Keyspace::default();
        ks.set_string("a", b"1".to_vec());
        ks.insert(
            "b".to_owned(),
            Entry {
                data: Data::Str(b"2".to_vec()),
                expires_at: Some(now_ms() - 1),
            },
        );
        assert!(ks.contains("a"));
        assert!(!ks.contains("b"));
        assert_eq!(ks.len(), 1);
    }

    #[test]
    fn typed_access_rejects_other_types() {
        let mut ks = Keyspace::default();
        ks.set_string("s", b"x".to_vec());
        assert!(ks.list("s").is_err());
        assert!(ks.list("missing").unwrap().is_none());
        ks.list_or_create("l").unwrap().push_back(b"a".to_vec());
        assert_eq!(ks.list("l").unwrap().map(|l| l.len()), Some(1));
    }
}
