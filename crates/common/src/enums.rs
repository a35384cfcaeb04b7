//! Enumerations shared by the three services.
//!
//! Each enum has a stable integer code. The code is what goes on the wire
//! and into the database, so the variants and their numbers must never be
//! reordered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An integer did not map to any variant of the target enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid {kind} code: {code}")]
pub struct InvalidCode {
    pub kind: &'static str,
    pub code: i32,
}

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "i32", try_from = "i32")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the stable integer code.
            pub fn code(&self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Returns the variant name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.code()
            }
        }

        impl TryFrom<i32> for $name {
            type Error = InvalidCode;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(InvalidCode {
                        kind: stringify!($name),
                        code,
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

code_enum!(
    /// Channel the order came in through.
    OrderSource {
        Counter = 0 => "COUNTER",
        Web = 1 => "WEB",
    }
);

code_enum!(
    /// Fulfillment status of an order or a line item.
    ///
    /// ```text
    /// Placed ──► InProcess ──► Fulfilled
    /// ```
    Status {
        Placed = 0 => "PLACED",
        InProcess = 1 => "IN_PROCESS",
        Fulfilled = 2 => "FULFILLED",
    }
);

code_enum!(
    /// Store location.
    Location {
        Atlanta = 0 => "ATLANTA",
        Charlotte = 1 => "CHARLOTTE",
        Raleigh = 2 => "RALEIGH",
    }
);

code_enum!(
    /// Orderable product. Codes 0..=5 are drinks, the rest is food.
    ItemType {
        Cappuccino = 0 => "CAPPUCCINO",
        CoffeeBlack = 1 => "COFFEE_BLACK",
        CoffeeWithRoom = 2 => "COFFEE_WITH_ROOM",
        Espresso = 3 => "ESPRESSO",
        EspressoDouble = 4 => "ESPRESSO_DOUBLE",
        Latte = 5 => "LATTE",
        CakePop = 6 => "CAKEPOP",
        Croissant = 7 => "CROISSANT",
        Muffin = 8 => "MUFFIN",
        CroissantChocolate = 9 => "CROISSANT_CHOCOLATE",
    }
);

impl Status {
    /// Returns true once nothing is left to do.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Status::Fulfilled)
    }
}

impl ItemType {
    /// Catalog name of the item, also used as the line item name.
    pub fn name(&self) -> &'static str {
        self.as_str()
    }

    /// Returns true if the item is prepared by the barista.
    pub fn is_drink(&self) -> bool {
        self.code() <= ItemType::Latte.code()
    }
}
