//! Decompiled method bodies: the translator's input.
//!
//! A body is a tree of structured [`ILNode`]s (blocks, conditions, loops,
//! protected regions) whose leaves are [`ILExpression`]s. Expressions nest:
//! an instruction's operands are its `arguments`. Types on expressions come
//! from the decompiler's inference and may be absent.

use jsil_metadata::{FieldRef, MethodRef, PrimitiveKind, TypeRef};
use std::fmt;

// =============================================================================
// Opcodes
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ILCode {
    // Arithmetic and bitwise
    Add,
    AddOvf,
    AddOvfUn,
    Sub,
    SubOvf,
    SubOvfUn,
    Mul,
    MulOvf,
    MulOvfUn,
    Div,
    DivUn,
    Rem,
    RemUn,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ShrUn,
    Neg,
    Not,

    // Comparison and logic
    Ceq,
    Cgt,
    CgtUn,
    Clt,
    CltUn,
    LogicNot,
    LogicAnd,
    LogicOr,
    NullCoalescing,
    TernaryOp,

    // Locals and arguments
    Ldloc,
    Ldloca,
    Stloc,

    // Fields
    Ldfld,
    Ldflda,
    Stfld,
    Ldsfld,
    Ldsflda,
    Stsfld,

    // Indirect access
    Ldobj,
    Ldind,
    LdindTyped(PrimitiveKind),
    LdindRef,
    Stobj,
    Stind,
    StindTyped(PrimitiveKind),
    StindRef,

    // Constants and tokens
    Ldc,
    LdcI4,
    LdcI8,
    LdcR4,
    LdcR8,
    Ldstr,
    Ldnull,
    Ldftn,
    Ldtoken,

    // Arrays
    Newarr,
    Ldlen,
    Ldelem,
    LdelemTyped(PrimitiveKind),
    LdelemAny,
    LdelemRef,
    Stelem,
    StelemTyped(PrimitiveKind),
    StelemAny,
    StelemRef,
    InitArray,

    // Objects and conversions
    Newobj,
    InitObject,
    InitCollection,
    InitializedObject,
    Castclass,
    Isinst,
    UnboxAny,
    Box,
    Conv(PrimitiveKind),
    ConvOvf(PrimitiveKind),
    ConvOvfUn(PrimitiveKind),

    // Calls
    Call,
    Callvirt,
    CallGetter,
    CallSetter,
    CallvirtGetter,
    CallvirtSetter,
    PostIncrement,

    // Control transfer
    Ret,
    Throw,
    Rethrow,
    Endfinally,
    LoopOrSwitchBreak,
    LoopContinue,
    Br,
    Dup,
    Pop,
    Nop,

    // Decoded but never translated
    Localloc,
    Sizeof,
    Calli,
    Ckfinite,
    Arglist,
    Jmp,
    Cpblk,
    Initblk,
    Mkrefany,
    Refanytype,
    Refanyval,
}

impl ILCode {
    /// The unqualified form this opcode falls back to when it has no
    /// dedicated translation.
    #[must_use]
    pub const fn base_code(self) -> Option<ILCode> {
        use ILCode::*;
        Some(match self {
            AddOvf | AddOvfUn => Add,
            SubOvf | SubOvfUn => Sub,
            MulOvf | MulOvfUn => Mul,
            DivUn => Div,
            RemUn => Rem,
            CgtUn => Cgt,
            CltUn => Clt,
            LdcI4 | LdcI8 | LdcR4 | LdcR8 => Ldc,
            LdindTyped(_) | LdindRef => Ldind,
            StindTyped(_) | StindRef => Stind,
            LdelemTyped(_) | LdelemAny | LdelemRef => Ldelem,
            StelemTyped(_) | StelemAny | StelemRef => Stelem,
            ConvOvf(kind) | ConvOvfUn(kind) => Conv(kind),
            _ => return None,
        })
    }

    #[must_use]
    pub const fn is_constant_load(self) -> bool {
        matches!(
            self,
            ILCode::Ldc | ILCode::LdcI4 | ILCode::LdcI8 | ILCode::LdcR4 | ILCode::LdcR8
        )
    }
}

impl fmt::Display for ILCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffixed = |f: &mut fmt::Formatter<'_>, base: &str, kind: &PrimitiveKind| {
            let short = kind.full_name().trim_start_matches("System.");
            write!(f, "{base}_{short}")
        };
        match self {
            ILCode::LdindTyped(k) => suffixed(f, "Ldind", k),
            ILCode::StindTyped(k) => suffixed(f, "Stind", k),
            ILCode::LdelemTyped(k) => suffixed(f, "Ldelem", k),
            ILCode::StelemTyped(k) => suffixed(f, "Stelem", k),
            ILCode::Conv(k) => suffixed(f, "Conv", k),
            ILCode::ConvOvf(k) => suffixed(f, "Conv_Ovf", k),
            ILCode::ConvOvfUn(k) => suffixed(f, "Conv_Ovf_Un", k),
            other => write!(f, "{other:?}"),
        }
    }
}

// =============================================================================
// Operands
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum ILVariableKind {
    Local,
    Parameter { index: u32 },
    This,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ILVariable {
    pub name: String,
    pub variable_type: TypeRef,
    pub kind: ILVariableKind,
}

impl ILVariable {
    #[must_use]
    pub fn local(name: &str, variable_type: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            variable_type,
            kind: ILVariableKind::Local,
        }
    }

    #[must_use]
    pub fn parameter(name: &str, variable_type: TypeRef, index: u32) -> Self {
        Self {
            name: name.to_string(),
            variable_type,
            kind: ILVariableKind::Parameter { index },
        }
    }

    /// The implicit receiver; typed `T&` inside value-type methods.
    #[must_use]
    pub fn this(this_type: TypeRef) -> Self {
        Self {
            name: "this".to_string(),
            variable_type: this_type,
            kind: ILVariableKind::This,
        }
    }

    #[must_use]
    pub fn is_this(&self) -> bool {
        self.kind == ILVariableKind::This
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ILOperand {
    #[default]
    None,
    Variable(ILVariable),
    Field(FieldRef),
    Method(MethodRef),
    Type(TypeRef),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Label(String),
}

impl ILOperand {
    /// Bytecode-level name of the operand's kind, as reported in
    /// untranslatable-instruction placeholders.
    #[must_use]
    pub const fn type_name(&self) -> Option<&'static str> {
        Some(match self {
            ILOperand::None => return None,
            ILOperand::Variable(_) => "ILVariable",
            ILOperand::Field(_) => "FieldReference",
            ILOperand::Method(_) => "MethodReference",
            ILOperand::Type(_) => "TypeReference",
            ILOperand::Int(_) => "System.Int64",
            ILOperand::UInt(_) => "System.UInt64",
            ILOperand::Float(_) => "System.Double",
            ILOperand::String(_) => "System.String",
            ILOperand::Label(_) => "ILLabel",
        })
    }
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct ILExpression {
    pub code: ILCode,
    pub operand: ILOperand,
    pub arguments: Vec<ILExpression>,
    /// Type the consumer of this value expects.
    pub expected_type: Option<TypeRef>,
    /// Type the decompiler inferred for the value itself.
    pub inferred_type: Option<TypeRef>,
}

impl ILExpression {
    #[must_use]
    pub fn new(code: ILCode) -> Self {
        Self {
            code,
            operand: ILOperand::None,
            arguments: Vec::new(),
            expected_type: None,
            inferred_type: None,
        }
    }

    #[must_use]
    pub fn with_operand(mut self, operand: ILOperand) -> Self {
        self.operand = operand;
        self
    }

    #[must_use]
    pub fn with_argument(mut self, argument: ILExpression) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = ILExpression>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    /// Sets both expected and inferred type.
    #[must_use]
    pub fn typed(mut self, ty: TypeRef) -> Self {
        self.expected_type = Some(ty.clone());
        self.inferred_type = Some(ty);
        self
    }

    #[must_use]
    pub fn expecting(mut self, ty: TypeRef) -> Self {
        self.expected_type = Some(ty);
        self
    }

    #[must_use]
    pub fn inferred(mut self, ty: TypeRef) -> Self {
        self.inferred_type = Some(ty);
        self
    }

    // ---------------------------------------------------------------- shorthands

    #[must_use]
    pub fn ldloc(variable: &ILVariable) -> Self {
        Self::new(ILCode::Ldloc)
            .with_operand(ILOperand::Variable(variable.clone()))
            .typed(variable.variable_type.clone())
    }

    #[must_use]
    pub fn ldloca(variable: &ILVariable) -> Self {
        Self::new(ILCode::Ldloca)
            .with_operand(ILOperand::Variable(variable.clone()))
            .typed(variable.variable_type.clone().by_ref())
    }

    #[must_use]
    pub fn stloc(variable: &ILVariable, value: ILExpression) -> Self {
        Self::new(ILCode::Stloc)
            .with_operand(ILOperand::Variable(variable.clone()))
            .with_argument(value)
    }

    #[must_use]
    pub fn ldc_i4(value: i32) -> Self {
        Self::new(ILCode::LdcI4).with_operand(ILOperand::Int(i64::from(value)))
    }

    #[must_use]
    pub fn ldstr(text: &str) -> Self {
        Self::new(ILCode::Ldstr).with_operand(ILOperand::String(text.to_string()))
    }

    #[must_use]
    pub fn call(code: ILCode, method: MethodRef, arguments: Vec<ILExpression>) -> Self {
        let result = method.resolved_return_type();
        Self::new(code)
            .with_operand(ILOperand::Method(method))
            .with_arguments(arguments)
            .inferred(result)
    }

    /// The instruction's `index`th operand expression.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&ILExpression> {
        self.arguments.get(index)
    }

    /// Inferred type, falling back to the expected type.
    #[must_use]
    pub fn value_type(&self) -> Option<&TypeRef> {
        self.inferred_type.as_ref().or(self.expected_type.as_ref())
    }
}

// =============================================================================
// Structured nodes
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ILBlock {
    pub body: Vec<ILNode>,
}

impl ILBlock {
    #[must_use]
    pub fn new(body: Vec<ILNode>) -> Self {
        Self { body }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ILCatchBlock {
    pub exception_type: TypeRef,
    pub exception_variable: Option<ILVariable>,
    pub body: ILBlock,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ILTryCatchBlock {
    pub try_block: ILBlock,
    pub catch_blocks: Vec<ILCatchBlock>,
    pub finally_block: Option<ILBlock>,
    pub fault_block: Option<ILBlock>,
}

/// One arm of a switch; no values means `default`.
#[derive(Clone, Debug, PartialEq)]
pub struct ILCase {
    pub values: Vec<i64>,
    pub body: ILBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ILNode {
    Block(ILBlock),
    Expression(ILExpression),
    Condition {
        condition: ILExpression,
        true_block: ILBlock,
        false_block: Option<ILBlock>,
    },
    WhileLoop {
        condition: Option<ILExpression>,
        body: ILBlock,
    },
    TryCatch(ILTryCatchBlock),
    Switch {
        condition: ILExpression,
        cases: Vec<ILCase>,
    },
    Label(String),
}

// =============================================================================
// Method bodies
// =============================================================================

/// A decompiled method: its reference, declared parameters and locals, and
/// the structured body.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodBody {
    pub method: MethodRef,
    pub parameters: Vec<ILVariable>,
    pub variables: Vec<ILVariable>,
    pub block: ILBlock,
}

impl MethodBody {
    #[must_use]
    pub fn new(method: MethodRef, block: ILBlock) -> Self {
        Self {
            method,
            parameters: Vec::new(),
            variables: Vec::new(),
            block,
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: ILVariable) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_variable(mut self, variable: ILVariable) -> Self {
        self.variables.push(variable);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_codes_fall_back_to_base() {
        assert_eq!(ILCode::AddOvfUn.base_code(), Some(ILCode::Add));
        assert_eq!(ILCode::CltUn.base_code(), Some(ILCode::Clt));
        assert_eq!(
            ILCode::ConvOvfUn(PrimitiveKind::Int16).base_code(),
            Some(ILCode::Conv(PrimitiveKind::Int16))
        );
        assert_eq!(ILCode::Conv(PrimitiveKind::Int16).base_code(), None);
        assert_eq!(ILCode::Localloc.base_code(), None);
    }

    #[test]
    fn test_code_names() {
        assert_eq!(ILCode::Localloc.to_string(), "Localloc");
        assert_eq!(ILCode::Conv(PrimitiveKind::Int32).to_string(), "Conv_Int32");
        assert_eq!(
            ILCode::LdelemTyped(PrimitiveKind::Byte).to_string(),
            "Ldelem_Byte"
        );
    }
}
