// Alpha compare (PE alpha test) registers.

use serde::{Deserialize, Serialize};

/// GX compare function, shared by depth test and alpha compare.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompareMode {
    Never = 0,
    Less = 1,
    Equal = 2,
    LessEqual = 3,
    Greater = 4,
    NotEqual = 5,
    GreaterEqual = 6,
    #[default]
    Always = 7,
}

impl CompareMode {
    pub const ALL: [CompareMode; 8] = [
        CompareMode::Never,
        CompareMode::Less,
        CompareMode::Equal,
        CompareMode::LessEqual,
        CompareMode::Greater,
        CompareMode::NotEqual,
        CompareMode::GreaterEqual,
        CompareMode::Always,
    ];

    pub fn from_raw(raw: u8) -> Self {
        Self::ALL[(raw & 0x7) as usize]
    }

    /// Evaluates `value <op> reference`.
    pub fn compare(self, value: u8, reference: u8) -> bool {
        match self {
            CompareMode::Never => false,
            CompareMode::Less => value < reference,
            CompareMode::Equal => value == reference,
            CompareMode::LessEqual => value <= reference,
            CompareMode::Greater => value > reference,
            CompareMode::NotEqual => value != reference,
            CompareMode::GreaterEqual => value >= reference,
            CompareMode::Always => true,
        }
    }
}

/// Logic connective joining the two alpha comparisons.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlphaTestOp {
    #[default]
    And = 0,
    Or = 1,
    Xor = 2,
    Xnor = 3,
}

impl AlphaTestOp {
    pub const ALL: [AlphaTestOp; 4] =
        [AlphaTestOp::And, AlphaTestOp::Or, AlphaTestOp::Xor, AlphaTestOp::Xnor];

    pub fn from_raw(raw: u8) -> Self {
        Self::ALL[(raw & 0x3) as usize]
    }

    pub fn combine(self, lhs: bool, rhs: bool) -> bool {
        match self {
            AlphaTestOp::And => lhs && rhs,
            AlphaTestOp::Or => lhs || rhs,
            AlphaTestOp::Xor => lhs != rhs,
            AlphaTestOp::Xnor => lhs == rhs,
        }
    }
}

/// Outcome of the alpha test that can be decided without the fragment alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlphaTestResult {
    Undetermined = 0,
    Fail = 1,
    Pass = 2,
}

/// Alpha test configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlphaTest {
    pub comp0: CompareMode,
    pub comp1: CompareMode,
    pub logic: AlphaTestOp,
    pub ref0: u8,
    pub ref1: u8,
}

impl AlphaTest {
    /// Full test as the hardware evaluates it.
    pub fn evaluate(&self, alpha: u8) -> bool {
        self.logic.combine(self.comp0.compare(alpha, self.ref0), self.comp1.compare(alpha, self.ref1))
    }

    /// Classifies the test using only the comparison functions.
    pub fn test_result(&self) -> AlphaTestResult {
        use CompareMode::{Always, Never};

        let (c0, c1) = (self.comp0, self.comp1);
        match self.logic {
            AlphaTestOp::And => {
                if c0 == Always && c1 == Always {
                    return AlphaTestResult::Pass;
                }
                if c0 == Never || c1 == Never {
                    return AlphaTestResult::Fail;
                }
            }
            AlphaTestOp::Or => {
                if c0 == Always || c1 == Always {
                    return AlphaTestResult::Pass;
                }
                if c0 == Never && c1 == Never {
                    return AlphaTestResult::Fail;
                }
            }
            AlphaTestOp::Xor => {
                if (c0 == Always && c1 == Never) || (c0 == Never && c1 == Always) {
                    return AlphaTestResult::Pass;
                }
                if (c0 == Always && c1 == Always) || (c0 == Never && c1 == Never) {
                    return AlphaTestResult::Fail;
                }
            }
            AlphaTestOp::Xnor => {
                if (c0 == Always && c1 == Never) || (c0 == Never && c1 == Always) {
                    return AlphaTestResult::Fail;
                }
                if (c0 == Always && c1 == Always) || (c0 == Never && c1 == Never) {
                    return AlphaTestResult::Pass;
                }
            }
        }
        AlphaTestResult::Undetermined
    }
}
