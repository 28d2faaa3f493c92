//! BIP32 derivation paths and BIP44 account paths.
//!
//! Both types are persistent values: every navigation method returns a new
//! path and leaves the receiver untouched. A path always starts at a root
//! marker, `m` for extended-private derivation or `M` for extended-public
//! derivation; the marker is part of the path's identity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{BIP44_PURPOSE, HARDENED_OFFSET, Network};
use crate::error::PathError;

/// Root marker of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Root {
    /// `m`: derivation over extended private keys.
    Private,
    /// `M`: derivation over extended public keys.
    Public,
}

impl Root {
    pub fn marker(&self) -> char {
        match self {
            Self::Private => 'm',
            Self::Public => 'M',
        }
    }
}

/// One level of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Level {
    index: u32,
    hardened: bool,
}

impl Level {
    /// Create a level. `index` must be below 2^31.
    pub fn new(index: u32, hardened: bool) -> Result<Self, PathError> {
        if index >= HARDENED_OFFSET {
            return Err(PathError::IndexOutOfRange(index as u64));
        }
        Ok(Self { index, hardened })
    }

    pub fn normal(index: u32) -> Result<Self, PathError> {
        Self::new(index, false)
    }

    pub fn hardened(index: u32) -> Result<Self, PathError> {
        Self::new(index, true)
    }

    /// Index without the hardening bit.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    /// Raw BIP32 child number, hardening bit included.
    pub fn child_number(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }

    fn with_index(self, index: u32) -> Result<Self, PathError> {
        Self::new(index, self.hardened)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl FromStr for Level {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match s.strip_suffix(['\'', 'h', 'H']) {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PathError::InvalidLevel(s.to_string()));
        }
        let index: u64 = digits
            .parse()
            .map_err(|_| PathError::InvalidLevel(s.to_string()))?;
        if index >= HARDENED_OFFSET as u64 {
            return Err(PathError::IndexOutOfRange(index));
        }
        Self::new(index as u32, hardened)
    }
}

/// A BIP32 derivation path such as `m/44'/0'/0'/0/7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivationPath {
    root: Root,
    levels: Vec<Level>,
}

impl DerivationPath {
    pub fn new(root: Root, levels: Vec<Level>) -> Self {
        Self { root, levels }
    }

    /// The bare private root, `m`.
    pub fn master() -> Self {
        Self::new(Root::Private, Vec::new())
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Number of levels below the root marker.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_public_path(&self) -> bool {
        self.root == Root::Public
    }

    pub fn is_private_path(&self) -> bool {
        self.root == Root::Private
    }

    /// Whether the last level is hardened. The bare root is not.
    pub fn is_hardened(&self) -> bool {
        self.levels.last().is_some_and(Level::is_hardened)
    }

    /// The last level, if any.
    pub fn last(&self) -> Option<Level> {
        self.levels.last().copied()
    }

    /// Sibling path with the last index incremented.
    pub fn next(&self) -> Result<Self, PathError> {
        let last = self.last().ok_or(PathError::NoLevels)?;
        let next = last
            .index()
            .checked_add(1)
            .ok_or(PathError::IndexOutOfRange(last.index() as u64 + 1))?;
        self.replace_last(last.with_index(next)?)
    }

    pub fn parent(&self) -> Result<Self, PathError> {
        if self.levels.is_empty() {
            return Err(PathError::NoLevels);
        }
        Ok(Self::new(self.root, self.levels[..self.levels.len() - 1].to_vec()))
    }

    pub fn child(&self, level: Level) -> Self {
        let mut levels = self.levels.clone();
        levels.push(level);
        Self::new(self.root, levels)
    }

    /// Same path with the last level hardened.
    pub fn hardened(&self) -> Result<Self, PathError> {
        let last = self.last().ok_or(PathError::NoLevels)?;
        self.replace_last(Level::hardened(last.index())?)
    }

    /// Same path with the last level not hardened.
    pub fn unhardened(&self) -> Result<Self, PathError> {
        let last = self.last().ok_or(PathError::NoLevels)?;
        self.replace_last(Level::normal(last.index())?)
    }

    /// Same levels under the public root `M`.
    pub fn public_path(&self) -> Self {
        Self::new(Root::Public, self.levels.clone())
    }

    /// Same levels under the private root `m`.
    pub fn private_path(&self) -> Self {
        Self::new(Root::Private, self.levels.clone())
    }

    /// Insert `level` so that it becomes level number `offset` (0 is directly
    /// below the root).
    pub fn insert(&self, offset: usize, level: Level) -> Result<Self, PathError> {
        if offset > self.levels.len() {
            return Err(PathError::InsertOutOfBounds {
                offset,
                depth: self.levels.len(),
            });
        }
        let mut levels = self.levels.clone();
        levels.insert(offset, level);
        Ok(Self::new(self.root, levels))
    }

    /// True iff `other` strictly extends this path under the same root marker.
    pub fn is_parent_of(&self, other: &DerivationPath) -> bool {
        self.root == other.root
            && other.levels.len() > self.levels.len()
            && other.levels.starts_with(&self.levels)
    }

    /// Levels of `self` below `ancestor`, comparing levels only.
    ///
    /// Returns `None` when `ancestor`'s levels are not a prefix of ours.
    pub fn relative_to(&self, ancestor: &DerivationPath) -> Option<&[Level]> {
        if self.levels.starts_with(&ancestor.levels) {
            Some(&self.levels[ancestor.levels.len()..])
        } else {
            None
        }
    }

    fn replace_last(&self, level: Level) -> Result<Self, PathError> {
        let mut levels = self.levels.clone();
        match levels.last_mut() {
            Some(last) => *last = level,
            None => return Err(PathError::NoLevels),
        }
        Ok(Self::new(self.root, levels))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.marker())?;
        for level in &self.levels {
            write!(f, "/{level}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let mut parts = s.split('/');
        let root = match parts.next() {
            Some("m") => Root::Private,
            Some("M") => Root::Public,
            Some(other) => return Err(PathError::InvalidRoot(other.to_string())),
            None => return Err(PathError::Empty),
        };
        let levels = parts.map(Level::from_str).collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(root, levels))
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// BIP44 address position: `m/44'/coin'/account'/chain/index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountPath {
    coin: u32,
    account: u32,
    internal: bool,
    index: u32,
}

impl AccountPath {
    /// First external address of `account` for `coin`.
    pub fn new(coin: u32, account: u32) -> Result<Self, PathError> {
        Level::hardened(coin)?;
        Level::hardened(account)?;
        Ok(Self {
            coin,
            account,
            internal: false,
            index: 0,
        })
    }

    pub fn for_network(network: Network, account: u32) -> Result<Self, PathError> {
        Self::new(network.coin_type(), account)
    }

    pub fn coin(&self) -> u32 {
        self.coin
    }

    pub fn account_index(&self) -> u32 {
        self.account
    }

    pub fn is_external(&self) -> bool {
        !self.internal
    }

    /// Chain level: 0 for receiving, 1 for change.
    pub fn chain(&self) -> u32 {
        u32::from(self.internal)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Next address on the same chain.
    pub fn next(&self) -> Result<Self, PathError> {
        self.with_index(self.index.saturating_add(1))
    }

    /// Switch account; the address index restarts at 0.
    pub fn account(&self, account: u32) -> Result<Self, PathError> {
        Level::hardened(account)?;
        Ok(Self {
            account,
            index: 0,
            ..*self
        })
    }

    /// Switch between receiving (`true`) and change chains; the address
    /// index restarts at 0.
    pub fn external(&self, external: bool) -> Self {
        Self {
            internal: !external,
            index: 0,
            ..*self
        }
    }

    pub fn with_index(&self, index: u32) -> Result<Self, PathError> {
        Level::normal(index)?;
        Ok(Self { index, ..*self })
    }

    /// `m/44'/coin'/account'`
    pub fn account_root(&self) -> DerivationPath {
        DerivationPath::new(
            Root::Private,
            vec![
                Level { index: BIP44_PURPOSE, hardened: true },
                Level { index: self.coin, hardened: true },
                Level { index: self.account, hardened: true },
            ],
        )
    }

    /// `m/44'/coin'/account'/chain`
    pub fn chain_path(&self) -> DerivationPath {
        self.account_root().child(Level {
            index: self.chain(),
            hardened: false,
        })
    }

    /// `m/44'/coin'/account'/chain/index`
    pub fn path(&self) -> DerivationPath {
        self.chain_path().child(Level {
            index: self.index,
            hardened: false,
        })
    }
}

impl fmt::Display for AccountPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path().fmt(f)
    }
}

impl TryFrom<&DerivationPath> for AccountPath {
    type Error = PathError;

    fn try_from(path: &DerivationPath) -> Result<Self, Self::Error> {
        let not_bip44 = || PathError::NotBip44(path.to_string());
        match path.levels() {
            [purpose, coin, account, chain, index]
                if purpose.index() == BIP44_PURPOSE
                    && purpose.is_hardened()
                    && coin.is_hardened()
                    && account.is_hardened()
                    && !chain.is_hardened()
                    && chain.index() <= 1
                    && !index.is_hardened() =>
            {
                Ok(Self {
                    coin: coin.index(),
                    account: account.index(),
                    internal: chain.index() == 1,
                    index: index.index(),
                })
            }
            _ => Err(not_bip44()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> DerivationPath {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(p("m/44'/0'/0'/0/5").to_string(), "m/44'/0'/0'/0/5");
        assert_eq!(p("M/9999'/0").to_string(), "M/9999'/0");
        assert_eq!(p("m").to_string(), "m");
        assert_eq!(p("m/1h/2H").to_string(), "m/1'/2'");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("".parse::<DerivationPath>(), Err(PathError::Empty));
        assert!(matches!("x/1".parse::<DerivationPath>(), Err(PathError::InvalidRoot(_))));
        assert!(matches!("m/a".parse::<DerivationPath>(), Err(PathError::InvalidLevel(_))));
        assert!(matches!("m//1".parse::<DerivationPath>(), Err(PathError::InvalidLevel(_))));
        assert!(matches!("m/-1".parse::<DerivationPath>(), Err(PathError::InvalidLevel(_))));
        assert_eq!(
            "m/2147483648".parse::<DerivationPath>(),
            Err(PathError::IndexOutOfRange(2_147_483_648))
        );
    }

    #[test]
    fn root_markers_are_exclusive() {
        let private = p("m/0");
        let public = p("M/0");
        assert!(private.is_private_path() && !private.is_public_path());
        assert!(public.is_public_path() && !public.is_private_path());
        assert_eq!(private.public_path(), public);
        assert_eq!(public.private_path(), private);
    }

    #[test]
    fn navigation_returns_new_paths() {
        let base = p("m/44'/0'/0'/0/5");
        assert_eq!(base.next().unwrap(), p("m/44'/0'/0'/0/6"));
        assert_eq!(base.parent().unwrap(), p("m/44'/0'/0'/0"));
        assert_eq!(base.child(Level::normal(3).unwrap()), p("m/44'/0'/0'/0/5/3"));
        assert_eq!(base.hardened().unwrap(), p("m/44'/0'/0'/0/5'"));
        assert_eq!(p("m/1'").unhardened().unwrap(), p("m/1"));
        assert_eq!(base.last(), Some(Level::normal(5).unwrap()));
        assert_eq!(
            base.insert(0, Level::hardened(9999).unwrap()).unwrap(),
            p("m/9999'/44'/0'/0'/0/5")
        );
        // Receiver untouched by every call above.
        assert_eq!(base, p("m/44'/0'/0'/0/5"));
    }

    #[test]
    fn next_keeps_hardening() {
        assert_eq!(p("m/7'").next().unwrap(), p("m/8'"));
    }

    #[test]
    fn root_only_navigation_fails() {
        let root = DerivationPath::master();
        assert_eq!(root.next(), Err(PathError::NoLevels));
        assert_eq!(root.parent(), Err(PathError::NoLevels));
        assert_eq!(root.hardened(), Err(PathError::NoLevels));
        assert_eq!(root.last(), None);
        assert!(!root.is_hardened());
    }

    #[test]
    fn next_overflow_is_rejected() {
        assert!(matches!(
            p("m/2147483647").next(),
            Err(PathError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn insert_out_of_bounds() {
        assert_eq!(
            p("m/1").insert(2, Level::normal(0).unwrap()),
            Err(PathError::InsertOutOfBounds { offset: 2, depth: 1 })
        );
        assert_eq!(p("m/1").insert(1, Level::normal(0).unwrap()).unwrap(), p("m/1/0"));
    }

    #[test]
    fn parent_of_relation() {
        assert!(p("m/9999'/0").is_parent_of(&p("m/9999'/0/5")));
        assert!(p("m/9999'/0").is_parent_of(&p("m/9999'/0/5/1")));
        assert!(p("m").is_parent_of(&p("m/0")));
        assert!(!p("m/9999'/0").is_parent_of(&p("M/9999'/0/5")));
        assert!(!p("M/9999'/0").is_parent_of(&p("m/9999'/0/5")));
        assert!(!p("m/9999'/0").is_parent_of(&p("m/9999'/0")));
        assert!(!p("m/9999'/0").is_parent_of(&p("m/9999/0/5")));
        assert!(!p("m/9999'/0/5").is_parent_of(&p("m/9999'/0")));
    }

    #[test]
    fn relative_to_ignores_marker() {
        let child = p("M/44'/0'/0'/0/5");
        let rest = child.relative_to(&p("m/44'/0'")).unwrap();
        assert_eq!(rest.len(), 3);
        assert!(child.relative_to(&p("m/45'")).is_none());
    }

    #[test]
    fn child_numbers() {
        assert_eq!(Level::hardened(44).unwrap().child_number(), 0x8000_002c);
        assert_eq!(Level::normal(44).unwrap().child_number(), 44);
    }

    #[test]
    fn serde_as_string() {
        let path = p("m/44'/1'/0'/1/3");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"m/44'/1'/0'/1/3\"");
        let back: DerivationPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_str::<DerivationPath>("\"q/1\"").is_err());
    }

    #[test]
    fn account_path_layout() {
        let acct = AccountPath::new(0, 2).unwrap();
        assert_eq!(acct.path(), p("m/44'/0'/2'/0/0"));
        assert_eq!(acct.account_root(), p("m/44'/0'/2'"));
        assert_eq!(acct.chain_path(), p("m/44'/0'/2'/0"));
        assert_eq!(acct.external(false).path(), p("m/44'/0'/2'/1/0"));
    }

    #[test]
    fn account_path_navigation_resets_index() {
        let acct = AccountPath::new(145, 0).unwrap().next().unwrap().next().unwrap();
        assert_eq!(acct.index(), 2);
        assert_eq!(acct.account(3).unwrap().index(), 0);
        assert_eq!(acct.account(3).unwrap().account_index(), 3);
        assert_eq!(acct.external(false).index(), 0);
        assert!(!acct.external(false).is_external());
        assert_eq!(acct.external(false).chain(), 1);
        assert_eq!(acct.to_string(), "m/44'/145'/0'/0/2");
    }

    #[test]
    fn account_path_for_network() {
        let acct = AccountPath::for_network(Network::BitcoinCash, 1).unwrap();
        assert_eq!(acct.path(), p("m/44'/145'/1'/0/0"));
    }

    #[test]
    fn account_path_rejects_out_of_range() {
        assert!(AccountPath::new(HARDENED_OFFSET, 0).is_err());
        assert!(AccountPath::new(0, 0).unwrap().with_index(HARDENED_OFFSET).is_err());
    }

    #[test]
    fn account_path_from_derivation_path() {
        let acct = AccountPath::try_from(&p("m/44'/1'/4'/1/9")).unwrap();
        assert_eq!(acct.coin(), 1);
        assert_eq!(acct.account_index(), 4);
        assert!(!acct.is_external());
        assert_eq!(acct.index(), 9);
        assert!(AccountPath::try_from(&p("m/49'/1'/4'/1/9")).is_err());
        assert!(AccountPath::try_from(&p("m/44'/1'/4'/2/9")).is_err());
        assert!(AccountPath::try_from(&p("m/44'/1'/4'")).is_err());
    }

    proptest! {
        #[test]
        fn display_parse_roundtrip(
            public in any::<bool>(),
            raw in proptest::collection::vec((0u32..HARDENED_OFFSET, any::<bool>()), 0..8),
        ) {
            let root = if public { Root::Public } else { Root::Private };
            let levels = raw.iter().map(|&(i, h)| Level::new(i, h).unwrap()).collect();
            let path = DerivationPath::new(root, levels);
            prop_assert_eq!(path.to_string().parse::<DerivationPath>().unwrap(), path);
        }

        #[test]
        fn child_is_always_a_child(
            raw in proptest::collection::vec(0u32..1000, 0..6),
            extra in 0u32..1000,
        ) {
            let levels = raw.iter().map(|&i| Level::normal(i).unwrap()).collect();
            let path = DerivationPath::new(Root::Private, levels);
            let child = path.child(Level::normal(extra).unwrap());
            prop_assert!(path.is_parent_of(&child));
            prop_assert_eq!(child.parent().unwrap(), path.clone());
            prop_assert!(!path.public_path().is_parent_of(&child));
        }
    }
}
