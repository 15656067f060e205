//! Dice rolling value objects and parsing
//!
//! Supports dice formulas like "1d8", "2d6+1", "4d6kh3" (roll four, keep the
//! highest three). Rolling takes an injected RNG so callers stay in control
//! of determinism.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error when parsing a dice formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    /// The formula string is empty
    #[error("Empty dice formula")]
    Empty,
    /// Invalid format - expected XdY, XdY+Z or XdYkhN
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    /// Dice count must be at least 1
    #[error("Dice count must be at least 1")]
    InvalidDiceCount,
    /// Die size must be at least 2
    #[error("Die size must be at least 2")]
    InvalidDieSize,
    /// Cannot keep more dice than were rolled
    #[error("Cannot keep {keep} of {count} dice")]
    InvalidKeep { keep: u8, count: u8 },
}

/// A parsed dice formula like "2d6+3"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceFormula {
    /// Number of dice to roll (X in XdY)
    pub dice_count: u8,
    /// Size of each die (Y in XdY)
    pub die_size: u8,
    /// Keep only the highest N dice (N in khN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_highest: Option<u8>,
    /// Modifier to add/subtract after rolling (+Z or -Z)
    #[serde(default)]
    pub modifier: i32,
}

impl DiceFormula {
    /// Create a new dice formula
    pub fn new(dice_count: u8, die_size: u8, modifier: i32) -> Result<Self, DiceParseError> {
        if dice_count == 0 {
            return Err(DiceParseError::InvalidDiceCount);
        }
        if die_size < 2 {
            return Err(DiceParseError::InvalidDieSize);
        }
        Ok(Self {
            dice_count,
            die_size,
            keep_highest: None,
            modifier,
        })
    }

    /// A single die of the given size, e.g. the `d8` hit die.
    pub fn single(die_size: u8) -> Result<Self, DiceParseError> {
        Self::new(1, die_size, 0)
    }

    /// Keep only the highest `keep` dice of the roll.
    pub fn keeping_highest(mut self, keep: u8) -> Result<Self, DiceParseError> {
        if keep == 0 || keep > self.dice_count {
            return Err(DiceParseError::InvalidKeep {
                keep,
                count: self.dice_count,
            });
        }
        self.keep_highest = Some(keep);
        Ok(self)
    }

    /// Parse a dice formula string like "1d8", "2d6-1", "4d6kh3"
    ///
    /// Supported formats:
    /// - "XdY" - Roll X dice of size Y
    /// - "XdY+Z" / "XdY-Z" - Roll X dice of size Y, add or subtract Z
    /// - "dY" - Roll 1 die of size Y (shorthand)
    /// - "XdYkhN" - Roll X dice of size Y and keep the highest N
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let d_pos = input.find('d').ok_or_else(|| {
            DiceParseError::InvalidFormat(format!("Missing 'd' separator in '{}'", input))
        })?;

        let dice_count_str = &input[..d_pos];
        let dice_count: u8 = if dice_count_str.is_empty() {
            1 // "d20" means "1d20"
        } else {
            dice_count_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid dice count: '{}'", dice_count_str))
            })?
        };

        if dice_count == 0 {
            return Err(DiceParseError::InvalidDiceCount);
        }

        let after_d = &input[d_pos + 1..];
        let size_end = after_d
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_d.len());
        let die_size_str = &after_d[..size_end];
        let die_size: u8 = die_size_str.parse().map_err(|_| {
            DiceParseError::InvalidFormat(format!("Invalid die size: '{}'", die_size_str))
        })?;
        if die_size < 2 {
            return Err(DiceParseError::InvalidDieSize);
        }

        let mut rest = &after_d[size_end..];
        let mut keep_highest = None;
        if let Some(after_kh) = rest.strip_prefix("kh") {
            let keep_end = after_kh
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_kh.len());
            let keep: u8 = after_kh[..keep_end].parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid keep count in '{}'", input))
            })?;
            if keep == 0 || keep > dice_count {
                return Err(DiceParseError::InvalidKeep {
                    keep,
                    count: dice_count,
                });
            }
            keep_highest = Some(keep);
            rest = &after_kh[keep_end..];
        }

        let modifier = if rest.is_empty() {
            0
        } else if let Some(mod_str) = rest.strip_prefix('+') {
            mod_str.parse::<i32>().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid modifier: '+{}'", mod_str))
            })?
        } else if let Some(mod_str) = rest.strip_prefix('-') {
            -mod_str.parse::<i32>().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid modifier: '-{}'", mod_str))
            })?
        } else {
            return Err(DiceParseError::InvalidFormat(format!(
                "Unexpected trailing input '{}'",
                rest
            )));
        };

        Ok(Self {
            dice_count,
            die_size,
            keep_highest,
            modifier,
        })
    }

    /// Number of dice that count toward the total.
    pub fn kept_count(&self) -> u8 {
        self.keep_highest.unwrap_or(self.dice_count)
    }

    /// Roll the dice with the supplied RNG and return the result
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> DiceRollResult {
        let mut individual_rolls = Vec::with_capacity(self.dice_count as usize);
        for _ in 0..self.dice_count {
            individual_rolls.push(rng.gen_range(1..=self.die_size as i32));
        }

        let mut kept = individual_rolls.clone();
        kept.sort_unstable_by(|a, b| b.cmp(a));
        kept.truncate(self.kept_count() as usize);

        let dice_total: i32 = kept.iter().sum();
        let total = dice_total + self.modifier;

        DiceRollResult {
            formula: self.clone(),
            individual_rolls,
            kept,
            dice_total,
            modifier_applied: self.modifier,
            total,
        }
    }

    /// Get the minimum possible roll
    pub fn min_roll(&self) -> i32 {
        self.kept_count() as i32 + self.modifier
    }

    /// Get the maximum possible roll
    pub fn max_roll(&self) -> i32 {
        (self.kept_count() as i32 * self.die_size as i32) + self.modifier
    }

    /// Fixed "take the average" value used when a roll is skipped.
    ///
    /// Rounds up per die, so a d8 averages to 5 and a d10 to 6.
    pub fn average(&self) -> i32 {
        self.kept_count() as i32 * (self.die_size as i32 / 2 + 1) + self.modifier
    }

    /// Format as a display string (e.g., "1d20+5")
    pub fn display(&self) -> String {
        let mut out = format!("{}d{}", self.dice_count, self.die_size);
        if let Some(keep) = self.keep_highest {
            out.push_str(&format!("kh{}", keep));
        }
        if self.modifier > 0 {
            out.push_str(&format!("+{}", self.modifier));
        } else if self.modifier < 0 {
            out.push_str(&self.modifier.to_string());
        }
        out
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Result of rolling dice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    /// The formula that was rolled
    pub formula: DiceFormula,
    /// Individual die results, in roll order
    pub individual_rolls: Vec<i32>,
    /// Dice that counted toward the total, highest first
    pub kept: Vec<i32>,
    /// Sum of kept dice before modifier
    pub dice_total: i32,
    /// Modifier that was applied
    pub modifier_applied: i32,
    /// Final total (dice_total + modifier)
    pub total: i32,
}

impl DiceRollResult {
    /// Format as a breakdown string (e.g., "4d6kh3[6, 5, 3, 1] = 14")
    pub fn breakdown(&self) -> String {
        let rolls_str: Vec<String> = self
            .individual_rolls
            .iter()
            .map(|r| r.to_string())
            .collect();
        format!(
            "{}[{}] = {}",
            self.formula.display(),
            rolls_str.join(", "),
            self.total
        )
    }
}
