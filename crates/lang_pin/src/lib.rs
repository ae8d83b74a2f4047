mod chain;
mod location;
pub mod narrow;
mod node;
mod pin;
mod signature;


pub use chain::{Call, Chain, Link};
pub use location::{Location, Position, Range};
pub use node::Node;
pub use pin::{
    BlockData, MethodData, NamespaceData, NamespaceKind, ParameterData, Pin, PinKind, PinRef,
    ReferenceData, ReferenceKind, VariableData, VariableKind, Visibility,
};
pub use signature::{generic, ParamDecl, Parameter, Signature};
