//! Object header message type identifiers.

macro_rules! message_types {
    ($($(#[$doc:meta])* $name:ident = $id:expr,)*) => {
        /// Header message types this crate distinguishes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageType {
            $($(#[$doc])* $name,)*
            /// Any other type, with its raw identifier.
            Unknown(u16),
        }

        impl MessageType {
            /// Map a raw type identifier.
            pub fn from_u16(raw: u16) -> MessageType {
                match raw {
                    $($id => MessageType::$name,)*
                    other => MessageType::Unknown(other),
                }
            }

            /// Raw type identifier.
            pub fn to_u16(self) -> u16 {
                match self {
                    $(MessageType::$name => $id,)*
                    MessageType::Unknown(raw) => raw,
                }
            }
        }
    };
}

message_types! {
    /// Padding with no content.
    Nil = 0x0000,
    Dataspace = 0x0001,
    LinkInfo = 0x0002,
    Datatype = 0x0003,
    FillValueOld = 0x0004,
    FillValue = 0x0005,
    Link = 0x0006,
    DataLayout = 0x0008,
    GroupInfo = 0x000A,
    FilterPipeline = 0x000B,
    Attribute = 0x000C,
    ObjectComment = 0x000D,
    SharedMessageTable = 0x000F,
    /// Points at the next chunk of header messages.
    Continuation = 0x0010,
    SymbolTable = 0x0011,
    ModificationTime = 0x0012,
    BTreeKValues = 0x0013,
    AttributeInfo = 0x0015,
    ReferenceCount = 0x0016,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids() {
        assert_eq!(MessageType::from_u16(0x000C), MessageType::Attribute);
        assert_eq!(MessageType::from_u16(0x0010), MessageType::Continuation);
        assert_eq!(MessageType::SymbolTable.to_u16(), 0x0011);
    }

    #[test]
    fn unknown_ids_keep_raw_value() {
        let t = MessageType::from_u16(0x0017);
        assert_eq!(t, MessageType::Unknown(0x0017));
        assert_eq!(t.to_u16(), 0x0017);
    }
}
