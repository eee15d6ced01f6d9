//! Tree kinds.

use std::fmt;

macro_rules! kinds {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)*) => {
        /// The kind tag of a tree element.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Kind {
            $($(#[$doc])* $variant,)*
        }

        impl Kind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [Kind] = &[$(Kind::$variant,)*];

            /// Returns the upper snake case name used in debug dumps.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Kind::$variant => $name,)*
                }
            }
        }
    };
}

kinds! {
    // === Declarations ===
    CompilationUnit => "COMPILATION_UNIT",
    PackageDeclaration => "PACKAGE",
    ImportDeclaration => "IMPORT",
    Class => "CLASS",
    Interface => "INTERFACE",
    Enum => "ENUM",
    AnnotationType => "ANNOTATION_TYPE",
    EnumConstant => "ENUM_CONSTANT",
    Method => "METHOD",
    Constructor => "CONSTRUCTOR",
    Initializer => "INITIALIZER",
    StaticInitializer => "STATIC_INITIALIZER",
    Variable => "VARIABLE",
    Modifiers => "MODIFIERS",
    Annotation => "ANNOTATION",

    // === Types ===
    PrimitiveType => "PRIMITIVE_TYPE",
    ArrayType => "ARRAY_TYPE",
    ParameterizedType => "PARAMETERIZED_TYPE",
    TypeParameters => "TYPE_PARAMETERS",
    Wildcard => "WILDCARD",
    UnionType => "UNION_TYPE",
    VarType => "VAR_TYPE",
    InferredType => "INFERED_TYPE",

    // === Statements ===
    Block => "BLOCK",
    EmptyStatement => "EMPTY_STATEMENT",
    LabeledStatement => "LABELED_STATEMENT",
    ExpressionStatement => "EXPRESSION_STATEMENT",
    IfStatement => "IF_STATEMENT",
    AssertStatement => "ASSERT_STATEMENT",
    SwitchStatement => "SWITCH_STATEMENT",
    CaseGroup => "CASE_GROUP",
    CaseLabel => "CASE_LABEL",
    WhileStatement => "WHILE_STATEMENT",
    DoStatement => "DO_STATEMENT",
    ForStatement => "FOR_STATEMENT",
    ForEachStatement => "FOR_EACH_STATEMENT",
    BreakStatement => "BREAK_STATEMENT",
    ContinueStatement => "CONTINUE_STATEMENT",
    ReturnStatement => "RETURN_STATEMENT",
    ThrowStatement => "THROW_STATEMENT",
    SynchronizedStatement => "SYNCHRONIZED_STATEMENT",
    TryStatement => "TRY_STATEMENT",
    Catch => "CATCH",

    // === Expressions ===
    ArrayAccessExpression => "ARRAY_ACCESS_EXPRESSION",
    ArrayDimension => "ARRAY_DIMENSION",
    MemberSelect => "MEMBER_SELECT",
    MethodInvocation => "METHOD_INVOCATION",
    NewClass => "NEW_CLASS",
    NewArray => "NEW_ARRAY",
    TypeCast => "TYPE_CAST",
    InstanceOf => "INSTANCE_OF",
    ParenthesizedExpression => "PARENTHESIZED_EXPRESSION",
    ConditionalExpression => "CONDITIONAL_EXPRESSION",
    LambdaExpression => "LAMBDA_EXPRESSION",
    MethodReference => "METHOD_REFERENCE",

    Assignment => "ASSIGNMENT",
    MultiplyAssignment => "MULTIPLY_ASSIGNMENT",
    DivideAssignment => "DIVIDE_ASSIGNMENT",
    RemainderAssignment => "REMAINDER_ASSIGNMENT",
    PlusAssignment => "PLUS_ASSIGNMENT",
    MinusAssignment => "MINUS_ASSIGNMENT",
    LeftShiftAssignment => "LEFT_SHIFT_ASSIGNMENT",
    RightShiftAssignment => "RIGHT_SHIFT_ASSIGNMENT",
    UnsignedRightShiftAssignment => "UNSIGNED_RIGHT_SHIFT_ASSIGNMENT",
    AndAssignment => "AND_ASSIGNMENT",
    XorAssignment => "XOR_ASSIGNMENT",
    OrAssignment => "OR_ASSIGNMENT",

    Multiply => "MULTIPLY",
    Divide => "DIVIDE",
    Remainder => "REMAINDER",
    Plus => "PLUS",
    Minus => "MINUS",
    LeftShift => "LEFT_SHIFT",
    RightShift => "RIGHT_SHIFT",
    UnsignedRightShift => "UNSIGNED_RIGHT_SHIFT",
    LessThan => "LESS_THAN",
    GreaterThan => "GREATER_THAN",
    LessThanOrEqualTo => "LESS_THAN_OR_EQUAL_TO",
    GreaterThanOrEqualTo => "GREATER_THAN_OR_EQUAL_TO",
    EqualTo => "EQUAL_TO",
    NotEqualTo => "NOT_EQUAL_TO",
    And => "AND",
    Xor => "XOR",
    Or => "OR",
    ConditionalAnd => "CONDITIONAL_AND",
    ConditionalOr => "CONDITIONAL_OR",

    PostfixIncrement => "POSTFIX_INCREMENT",
    PostfixDecrement => "POSTFIX_DECREMENT",
    PrefixIncrement => "PREFIX_INCREMENT",
    PrefixDecrement => "PREFIX_DECREMENT",
    UnaryPlus => "UNARY_PLUS",
    UnaryMinus => "UNARY_MINUS",
    BitwiseComplement => "BITWISE_COMPLEMENT",
    LogicalComplement => "LOGICAL_COMPLEMENT",

    IntLiteral => "INT_LITERAL",
    LongLiteral => "LONG_LITERAL",
    FloatLiteral => "FLOAT_LITERAL",
    DoubleLiteral => "DOUBLE_LITERAL",
    BooleanLiteral => "BOOLEAN_LITERAL",
    CharLiteral => "CHAR_LITERAL",
    StringLiteral => "STRING_LITERAL",
    TextBlock => "TEXT_BLOCK",
    NullLiteral => "NULL_LITERAL",
    Identifier => "IDENTIFIER",

    // === Leaves and placeholders ===
    /// A token leaf.
    Token => "TOKEN",
    /// A comment attached to a token.
    Trivia => "TRIVIA",
    /// A construct the tree model does not describe (or could not parse).
    NotImplemented => "OTHER",
}

impl Kind {
    /// Returns the length of the longest kind name.
    pub fn max_name_len() -> usize {
        Kind::ALL.iter().map(|k| k.as_str().len()).max().unwrap_or(0)
    }

    /// Returns true for the assignment family (`=`, `+=`, ...).
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Kind::Assignment
                | Kind::MultiplyAssignment
                | Kind::DivideAssignment
                | Kind::RemainderAssignment
                | Kind::PlusAssignment
                | Kind::MinusAssignment
                | Kind::LeftShiftAssignment
                | Kind::RightShiftAssignment
                | Kind::UnsignedRightShiftAssignment
                | Kind::AndAssignment
                | Kind::XorAssignment
                | Kind::OrAssignment
        )
    }

    /// Returns true for binary operators, including `&&` and `||`.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Kind::Multiply
                | Kind::Divide
                | Kind::Remainder
                | Kind::Plus
                | Kind::Minus
                | Kind::LeftShift
                | Kind::RightShift
                | Kind::UnsignedRightShift
                | Kind::LessThan
                | Kind::GreaterThan
                | Kind::LessThanOrEqualTo
                | Kind::GreaterThanOrEqualTo
                | Kind::EqualTo
                | Kind::NotEqualTo
                | Kind::And
                | Kind::Xor
                | Kind::Or
                | Kind::ConditionalAnd
                | Kind::ConditionalOr
        )
    }

    /// Returns true for prefix and postfix unary operators.
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Kind::PostfixIncrement
                | Kind::PostfixDecrement
                | Kind::PrefixIncrement
                | Kind::PrefixDecrement
                | Kind::UnaryPlus
                | Kind::UnaryMinus
                | Kind::BitwiseComplement
                | Kind::LogicalComplement
        )
    }

    /// Returns true for literal kinds.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Kind::IntLiteral
                | Kind::LongLiteral
                | Kind::FloatLiteral
                | Kind::DoubleLiteral
                | Kind::BooleanLiteral
                | Kind::CharLiteral
                | Kind::StringLiteral
                | Kind::TextBlock
                | Kind::NullLiteral
        )
    }

    /// Returns true for class-like declarations.
    pub fn is_type_declaration(&self) -> bool {
        matches!(
            self,
            Kind::Class | Kind::Interface | Kind::Enum | Kind::AnnotationType
        )
    }

    /// Returns true for type trees.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Kind::PrimitiveType
                | Kind::ArrayType
                | Kind::ParameterizedType
                | Kind::UnionType
                | Kind::VarType
                | Kind::InferredType
                | Kind::Wildcard
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_name() {
        assert_eq!(Kind::max_name_len(), "UNSIGNED_RIGHT_SHIFT_ASSIGNMENT".len());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = Kind::ALL.iter().map(Kind::as_str).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_families() {
        assert!(Kind::OrAssignment.is_assignment());
        assert!(Kind::ConditionalAnd.is_binary());
        assert!(!Kind::ConditionalAnd.is_assignment());
        assert!(Kind::LogicalComplement.is_unary());
        assert!(Kind::TextBlock.is_literal());
        assert!(Kind::Enum.is_type_declaration());
    }
}
