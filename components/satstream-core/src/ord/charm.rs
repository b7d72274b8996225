/// Decorative flags derived from an inscription's sat and its reveal context, packed into a
/// 16-bit field. The bit positions are part of the persisted data model and must not change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Charm {
    Coin = 0,
    Cursed = 1,
    Epic = 2,
    Legendary = 3,
    Lost = 4,
    Nineball = 5,
    Rare = 6,
    Reinscription = 7,
    Unbound = 8,
    Uncommon = 9,
    Vindicated = 10,
    Mythic = 11,
    Burned = 12,
    Palindrome = 13,
}

impl Charm {
    pub const ALL: [Charm; 14] = [
        Self::Coin,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
        Self::Mythic,
        Self::Nineball,
        Self::Reinscription,
        Self::Cursed,
        Self::Unbound,
        Self::Lost,
        Self::Vindicated,
        Self::Burned,
        Self::Palindrome,
    ];

    fn flag(self) -> u16 {
        1 << self as u16
    }

    pub fn set(self, charms: &mut u16) {
        *charms |= self.flag();
    }

    pub fn is_set(self, charms: u16) -> bool {
        charms & self.flag() != 0
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Coin => "coin",
            Self::Cursed => "cursed",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
            Self::Lost => "lost",
            Self::Nineball => "nineball",
            Self::Rare => "rare",
            Self::Reinscription => "reinscription",
            Self::Unbound => "unbound",
            Self::Uncommon => "uncommon",
            Self::Vindicated => "vindicated",
            Self::Mythic => "mythic",
            Self::Burned => "burned",
            Self::Palindrome => "palindrome",
        }
    }

    /// Decodes a charms bitfield into the charms it carries.
    pub fn charms(charms: u16) -> Vec<Charm> {
        Self::ALL
            .iter()
            .filter(|c| c.is_set(charms))
            .copied()
            .collect()
    }

    /// Decodes a charms bitfield into charm names, the read-time representation.
    pub fn titles(charms: u16) -> Vec<&'static str> {
        Self::charms(charms).into_iter().map(|c| c.title()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Charm;

    #[test]
    fn decodes_bitfield_to_names() {
        assert_eq!(
            Charm::titles(10369),
            vec!["coin", "mythic", "reinscription", "palindrome"]
        );
        assert_eq!(Charm::titles(0), Vec::<&str>::new());
    }

    #[test]
    fn set_and_test_round_trip() {
        let mut charms = 0u16;
        Charm::Reinscription.set(&mut charms);
        Charm::Vindicated.set(&mut charms);
        assert!(Charm::Reinscription.is_set(charms));
        assert!(Charm::Vindicated.is_set(charms));
        assert!(!Charm::Cursed.is_set(charms));
        assert_eq!(charms, (1 << 7) | (1 << 10));
    }
}
