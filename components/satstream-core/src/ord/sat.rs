use super::charm::Charm;
use super::rarity::Rarity;
use super::{COIN_VALUE, CYCLE_EPOCHS, DIFFCHANGE_INTERVAL, SUBSIDY_HALVING_INTERVAL};

/// A satoshi, identified by its ordinal number.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
pub struct Sat(pub u64);

/// First ordinal number of each subsidy epoch, ending with the total supply.
const STARTING_SATS: [u64; 34] = [
    0,
    1_050_000_000_000_000,
    1_575_000_000_000_000,
    1_837_500_000_000_000,
    1_968_750_000_000_000,
    2_034_375_000_000_000,
    2_067_187_500_000_000,
    2_083_593_750_000_000,
    2_091_796_875_000_000,
    2_095_898_437_500_000,
    2_097_949_218_750_000,
    2_098_974_609_270_000,
    2_099_487_304_530_000,
    2_099_743_652_160_000,
    2_099_871_825_870_000,
    2_099_935_912_620_000,
    2_099_967_955_890_000,
    2_099_983_977_420_000,
    2_099_991_988_080_000,
    2_099_995_993_410_000,
    2_099_997_995_970_000,
    2_099_998_997_250_000,
    2_099_999_497_890_000,
    2_099_999_748_210_000,
    2_099_999_873_370_000,
    2_099_999_935_950_000,
    2_099_999_967_240_000,
    2_099_999_982_780_000,
    2_099_999_990_550_000,
    2_099_999_994_330_000,
    2_099_999_996_220_000,
    2_099_999_997_060_000,
    2_099_999_997_480_000,
    Sat::SUPPLY,
];

impl Sat {
    pub const LAST: Self = Self(Self::SUPPLY - 1);
    pub const SUPPLY: u64 = 2_099_999_997_690_000;

    /// Validates an ordinal number coming from an external source.
    pub fn from_ordinal(ordinal_number: u64) -> Result<Self, String> {
        if ordinal_number > Self::LAST.0 {
            return Err(format!(
                "ordinal number out of range: {ordinal_number}"
            ));
        }
        Ok(Sat(ordinal_number))
    }

    pub fn n(self) -> u64 {
        self.0
    }

    /// The Bitcoin block height whose coinbase first minted this sat.
    pub fn height(self) -> u64 {
        self.epoch_starting_height() + self.epoch_position() / self.subsidy()
    }

    pub fn epoch(self) -> u64 {
        (STARTING_SATS.iter().filter(|s| **s <= self.0).count() - 1) as u64
    }

    pub fn period(self) -> u64 {
        self.height() / DIFFCHANGE_INTERVAL
    }

    pub fn cycle(self) -> u64 {
        self.epoch() / CYCLE_EPOCHS
    }

    pub fn nineball(self) -> bool {
        self.0 >= 50 * COIN_VALUE * 9 && self.0 < 50 * COIN_VALUE * 10
    }

    /// Offset of this sat within its coinbase block subsidy.
    pub fn third(self) -> u64 {
        self.epoch_position() % self.subsidy()
    }

    pub fn epoch_position(self) -> u64 {
        self.0 - STARTING_SATS[self.epoch() as usize]
    }

    fn subsidy(self) -> u64 {
        let epoch = self.epoch();
        if epoch < 64 {
            (50 * COIN_VALUE) >> epoch
        } else {
            0
        }
    }

    fn epoch_starting_height(self) -> u64 {
        self.epoch() * SUBSIDY_HALVING_INTERVAL
    }

    pub fn decimal(self) -> String {
        format!("{}.{}", self.height(), self.third())
    }

    pub fn degree(self) -> String {
        let height = self.height();
        format!(
            "{}°{}′{}″{}‴",
            height / (CYCLE_EPOCHS * SUBSIDY_HALVING_INTERVAL),
            height % SUBSIDY_HALVING_INTERVAL,
            height % DIFFCHANGE_INTERVAL,
            self.third(),
        )
    }

    pub fn percentile(self) -> String {
        format!("{}%", (self.0 as f64 / Self::LAST.0 as f64) * 100.0)
    }

    pub fn name(self) -> String {
        let mut x = Self::SUPPLY - self.0;
        let mut name = String::new();
        while x > 0 {
            name.push(
                "abcdefghijklmnopqrstuvwxyz"
                    .chars()
                    .nth(((x - 1) % 26) as usize)
                    .unwrap(),
            );
            x = (x - 1) / 26;
        }
        name.chars().rev().collect()
    }

    pub fn rarity(self) -> Rarity {
        let height = self.height();
        let hour = height / (CYCLE_EPOCHS * SUBSIDY_HALVING_INTERVAL);
        let minute = height % SUBSIDY_HALVING_INTERVAL;
        let second = height % DIFFCHANGE_INTERVAL;
        let third = self.third();

        if hour == 0 && minute == 0 && second == 0 && third == 0 {
            Rarity::Mythic
        } else if minute == 0 && second == 0 && third == 0 {
            Rarity::Legendary
        } else if minute == 0 && third == 0 {
            Rarity::Epic
        } else if second == 0 && third == 0 {
            Rarity::Rare
        } else if third == 0 {
            Rarity::Uncommon
        } else {
            Rarity::Common
        }
    }

    fn is_palindrome(self) -> bool {
        let digits = self.0.to_string();
        digits.chars().rev().collect::<String>() == digits
    }

    /// Charms carried by every inscription revealed on this sat.
    pub fn charms(self) -> u16 {
        let mut charms = 0u16;
        match self.rarity() {
            Rarity::Common => {}
            Rarity::Uncommon => Charm::Uncommon.set(&mut charms),
            Rarity::Rare => Charm::Rare.set(&mut charms),
            Rarity::Epic => Charm::Epic.set(&mut charms),
            Rarity::Legendary => Charm::Legendary.set(&mut charms),
            Rarity::Mythic => Charm::Mythic.set(&mut charms),
        };
        if self.nineball() {
            Charm::Nineball.set(&mut charms);
        }
        if self.0 % COIN_VALUE == 0 {
            Charm::Coin.set(&mut charms);
        }
        if self.is_palindrome() {
            Charm::Palindrome.set(&mut charms);
        }
        charms
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::super::charm::Charm;
    use super::super::rarity::Rarity;
    use super::super::COIN_VALUE;
    use super::Sat;

    #[test]
    fn name() {
        assert_eq!(Sat(0).name(), "nvtdijuwxlp");
        assert_eq!(Sat(1).name(), "nvtdijuwxlo");
        assert_eq!(Sat(26).name(), "nvtdijuwxkp");
        assert_eq!(Sat(2099999997689999).name(), "a");
        assert_eq!(Sat(2099999997689999 - 26).name(), "aa");
        assert_eq!(Sat(10_080_000_000_001).name(), "ntwwidfrzxg");
    }

    #[test]
    fn period_one_derivations() {
        let sat = Sat(10_080_000_000_001);
        assert_eq!(sat.height(), 2016);
        assert_eq!(sat.epoch(), 0);
        assert_eq!(sat.period(), 1);
        assert_eq!(sat.cycle(), 0);
        assert_eq!(sat.third(), 1);
        assert_eq!(sat.rarity(), Rarity::Common);
        assert_eq!(sat.decimal(), "2016.1");
        assert_eq!(sat.degree(), "0°2016′0″1‴");
        assert_eq!(sat.percentile(), "0.48000000052804787%");
    }

    #[test]
    fn rarity() {
        assert_eq!(Sat(0).rarity(), Rarity::Mythic);
        assert_eq!(Sat(1).rarity(), Rarity::Common);
        assert_eq!(Sat(50 * COIN_VALUE).rarity(), Rarity::Uncommon);
        assert_eq!(Sat(50 * COIN_VALUE * 2016).rarity(), Rarity::Rare);
        assert_eq!(Sat(50 * COIN_VALUE * 210000).rarity(), Rarity::Epic);
        assert_eq!(Sat(2067187500000000).rarity(), Rarity::Legendary);
        assert_eq!(Sat(2067187500000000 + 1).rarity(), Rarity::Common);
    }

    #[test]
    fn percentile() {
        assert_eq!(Sat(0).percentile(), "0%");
        assert_eq!(Sat::LAST.percentile(), "100%");
    }

    #[test]
    fn height() {
        assert_eq!(Sat(0).height(), 0);
        assert_eq!(Sat(1).height(), 0);
        assert_eq!(Sat(50 * COIN_VALUE).height(), 1);
        assert_eq!(Sat(1_050_000_000_000_000).height(), 210000);
        assert_eq!(Sat(257_418_248_345_364).height(), 51483);
    }

    #[test]
    fn from_ordinal_bounds() {
        assert!(Sat::from_ordinal(0).is_ok());
        assert!(Sat::from_ordinal(Sat::LAST.0).is_ok());
        assert!(Sat::from_ordinal(Sat::SUPPLY).is_err());
        assert!(Sat::from_ordinal(2099999997690000).is_err());
    }

    #[test_case(0 => vec![Charm::Coin, Charm::Mythic, Charm::Palindrome]; "mythic sat")]
    #[test_case(1_262_349_832_364_434 => Vec::<Charm>::new(); "common sat")]
    #[test_case(1_050_000_000_000_000 => vec![Charm::Coin, Charm::Epic]; "epic sat")]
    #[test_case(123_454_321 => vec![Charm::Palindrome]; "palindrome sat")]
    #[test_case(45_000_000_000 => vec![Charm::Coin, Charm::Uncommon, Charm::Nineball]; "nineball sat")]
    fn sat_charms(ordinal_number: u64) -> Vec<Charm> {
        Charm::charms(Sat(ordinal_number).charms())
    }
}
