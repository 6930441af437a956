// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Syntax tree consumed by the front-end.
//!
//! The parser that produces this tree lives outside this crate. The shapes
//! follow ESTree where possible, restricted to ES3 plus the JavaScript 1.x
//! extensions the lowering understands (`for each` and guarded `catch`).

use crate::token::Token;

/// A complete script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

impl Identifier {
    /// Creates an identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A statement with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// What kind of statement
    pub kind: StatementKind,
    /// 1-based line number, 0 when unknown
    pub line: u32,
}

impl Statement {
    /// Creates a statement with an unknown line.
    pub fn new(kind: StatementKind) -> Self {
        Self { kind, line: 0 }
    }

    /// Sets the line number.
    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// Expression statement.
    pub fn expression(expression: Expression) -> Self {
        Self::new(StatementKind::Expression(expression))
    }

    /// Block of statements.
    pub fn block(body: Vec<Statement>) -> Self {
        Self::new(StatementKind::Block(BlockStatement { body }))
    }

    /// `return` statement.
    pub fn ret(argument: Option<Expression>) -> Self {
        Self::new(StatementKind::Return(argument))
    }

    /// `var` statement with one declarator per `(name, init)` pair.
    pub fn var(declarations: Vec<(&str, Option<Expression>)>) -> Self {
        Self::new(StatementKind::VariableDeclaration(VariableDeclaration {
            declarations: declarations
                .into_iter()
                .map(|(name, init)| VariableDeclarator {
                    id: Identifier::new(name),
                    init,
                })
                .collect(),
        }))
    }
}

/// A JavaScript statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Variable declaration
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(Function),
    /// Expression statement
    Expression(Expression),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    DoWhile(DoWhileStatement),
    /// For statement
    For(ForStatement),
    /// For-in / for-each statement
    ForIn(ForInStatement),
    /// Return statement
    Return(Option<Expression>),
    /// Break statement with optional label
    Break(Option<Identifier>),
    /// Continue statement with optional label
    Continue(Option<Identifier>),
    /// Throw statement
    Throw(Expression),
    /// Try statement
    Try(TryStatement),
    /// With statement
    With(WithStatement),
    /// Labeled statement
    Labeled(LabeledStatement),
    /// Debugger statement
    Debugger,
    /// Empty statement (;)
    Empty,
}

/// A `var` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function declaration or expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Optional name
    pub id: Option<Identifier>,
    /// The parameters
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Statement>,
    /// Line of the `function` keyword
    pub line: u32,
}

impl Function {
    /// Creates a function.
    pub fn new(name: Option<&str>, params: &[&str], body: Vec<Statement>) -> Self {
        Self {
            id: name.map(Identifier::new),
            params: params.iter().map(|p| Identifier::new(*p)).collect(),
            body,
            line: 0,
        }
    }
}

/// A block statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A do-while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    /// The loop body
    pub body: Box<Statement>,
    /// The condition
    pub test: Expression,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// The initializer
    pub init: Option<ForInit>,
    /// The condition
    pub test: Option<Expression>,
    /// The update expression
    pub update: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// Variable declaration
    Declaration(VariableDeclaration),
    /// Expression
    Expression(Expression),
}

/// A for-in or for-each statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForInStatement {
    /// The left-hand side
    pub left: ForInLeft,
    /// The object to iterate over
    pub right: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// `for each` iterates values instead of keys
    pub each: bool,
}

/// Left-hand side of for-in.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInLeft {
    /// Variable declaration
    Declaration(VariableDeclaration),
    /// Expression (identifier or member)
    Expression(Expression),
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    /// The discriminant expression
    pub discriminant: Expression,
    /// The case clauses
    pub cases: Vec<SwitchCase>,
}

/// A switch case clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The test expression (None for default)
    pub test: Option<Expression>,
    /// The consequent statements
    pub consequent: Vec<Statement>,
}

/// A try statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    /// The try block
    pub block: BlockStatement,
    /// Catch clauses in source order
    pub handlers: Vec<CatchClause>,
    /// The finally block
    pub finalizer: Option<BlockStatement>,
}

/// A catch clause, optionally guarded (`catch (e if cond)`).
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// The exception binding
    pub param: Identifier,
    /// The guard condition
    pub guard: Option<Expression>,
    /// The catch body
    pub body: BlockStatement,
    /// Line of the `catch` keyword
    pub line: u32,
}

/// A with statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WithStatement {
    /// The object expression
    pub object: Expression,
    /// The body statement
    pub body: Box<Statement>,
}

/// A labeled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    /// The label identifier
    pub label: Identifier,
    /// The labeled body
    pub body: Box<Statement>,
}

/// A JavaScript expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// this keyword
    This,
    /// Array literal; `None` is a hole
    Array(Vec<Option<Expression>>),
    /// Object literal
    Object(Vec<Property>),
    /// Binary expression
    Binary(BinaryExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Assignment expression
    Assignment(AssignmentExpression),
    /// Call expression
    Call(CallExpression),
    /// new expression
    New(CallExpression),
    /// Member access expression
    Member(MemberExpression),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Function expression
    Function(Box<Function>),
    /// Update expression (++/--)
    Update(UpdateExpression),
    /// Sequence expression (comma operator)
    Sequence(Vec<Expression>),
}

impl Expression {
    /// Identifier reference.
    pub fn ident(name: &str) -> Self {
        Expression::Identifier(Identifier::new(name))
    }

    /// Number literal.
    pub fn number(value: f64) -> Self {
        Expression::Literal(Literal::Number(value))
    }

    /// String literal.
    pub fn string(value: &str) -> Self {
        Expression::Literal(Literal::String(value.to_string()))
    }

    /// Boolean literal.
    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    /// Binary expression.
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Unary expression.
    pub fn unary(operator: UnaryOperator, argument: Expression) -> Self {
        Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(argument),
        })
    }

    /// Plain `=` assignment.
    pub fn assign(left: Expression, right: Expression) -> Self {
        Expression::Assignment(AssignmentExpression {
            operator: AssignmentOperator::Assign,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Call expression.
    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call(CallExpression {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// Dotted property access.
    pub fn member(object: Expression, name: &str) -> Self {
        Expression::Member(MemberExpression {
            object: Box::new(object),
            property: MemberProperty::Identifier(Identifier::new(name)),
        })
    }

    /// Bracketed element access.
    pub fn index(object: Expression, index: Expression) -> Self {
        Expression::Member(MemberExpression {
            object: Box::new(object),
            property: MemberProperty::Computed(Box::new(index)),
        })
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// Regular expression literal
    RegExp {
        /// Pattern source
        pattern: String,
        /// Flags
        flags: String,
    },
}

/// An object literal property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The property key
    pub key: PropertyKey,
    /// The property value
    pub value: Expression,
}

/// An object literal key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier key
    Identifier(Identifier),
    /// Quoted string key
    String(String),
    /// Numeric key
    Number(f64),
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    // Comparison
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    // Logical
    LogicalAnd,
    LogicalOr,
    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    // Other
    In,
    InstanceOf,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The left-hand side
    pub left: Box<Expression>,
    /// The right-hand side
    pub right: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    BitwiseAndAssign,
    BitwiseOrAssign,
    BitwiseXorAssign,
}

/// A call or `new` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The function being called
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
}

/// Member property.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// Dotted name
    Identifier(Identifier),
    /// Bracketed expression
    Computed(Box<Expression>),
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// The consequent (if true)
    pub consequent: Box<Expression>,
    /// The alternate (if false)
    pub alternate: Box<Expression>,
}

/// An update expression (++/--)
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Whether prefix (++x) or postfix (x++)
    pub prefix: bool,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

impl BinaryOperator {
    /// Token shared by the IR node and the encoded source.
    pub fn token(self) -> Token {
        match self {
            BinaryOperator::Add => Token::Add,
            BinaryOperator::Subtract => Token::Sub,
            BinaryOperator::Multiply => Token::Mul,
            BinaryOperator::Divide => Token::Div,
            BinaryOperator::Modulo => Token::Mod,
            BinaryOperator::Equal => Token::Eq,
            BinaryOperator::NotEqual => Token::Ne,
            BinaryOperator::StrictEqual => Token::ShEq,
            BinaryOperator::StrictNotEqual => Token::ShNe,
            BinaryOperator::LessThan => Token::Lt,
            BinaryOperator::LessThanEqual => Token::Le,
            BinaryOperator::GreaterThan => Token::Gt,
            BinaryOperator::GreaterThanEqual => Token::Ge,
            BinaryOperator::LogicalAnd => Token::And,
            BinaryOperator::LogicalOr => Token::Or,
            BinaryOperator::BitwiseAnd => Token::BitAnd,
            BinaryOperator::BitwiseOr => Token::BitOr,
            BinaryOperator::BitwiseXor => Token::BitXor,
            BinaryOperator::LeftShift => Token::Lsh,
            BinaryOperator::RightShift => Token::Rsh,
            BinaryOperator::UnsignedRightShift => Token::Ursh,
            BinaryOperator::In => Token::In,
            BinaryOperator::InstanceOf => Token::InstanceOf,
        }
    }
}

impl UnaryOperator {
    /// Token shared by the IR node and the encoded source.
    pub fn token(self) -> Token {
        match self {
            UnaryOperator::Minus => Token::Neg,
            UnaryOperator::Plus => Token::Pos,
            UnaryOperator::LogicalNot => Token::Not,
            UnaryOperator::BitwiseNot => Token::BitNot,
            UnaryOperator::Typeof => Token::TypeOf,
            UnaryOperator::Void => Token::Void,
            UnaryOperator::Delete => Token::DelProp,
        }
    }
}

impl AssignmentOperator {
    /// `=` or compound assignment token.
    pub fn token(self) -> Token {
        match self {
            AssignmentOperator::Assign => Token::Assign,
            AssignmentOperator::AddAssign => Token::AssignAdd,
            AssignmentOperator::SubtractAssign => Token::AssignSub,
            AssignmentOperator::MultiplyAssign => Token::AssignMul,
            AssignmentOperator::DivideAssign => Token::AssignDiv,
            AssignmentOperator::ModuloAssign => Token::AssignMod,
            AssignmentOperator::LeftShiftAssign => Token::AssignLsh,
            AssignmentOperator::RightShiftAssign => Token::AssignRsh,
            AssignmentOperator::UnsignedRightShiftAssign => Token::AssignUrsh,
            AssignmentOperator::BitwiseAndAssign => Token::AssignBitAnd,
            AssignmentOperator::BitwiseOrAssign => Token::AssignBitOr,
            AssignmentOperator::BitwiseXorAssign => Token::AssignBitXor,
        }
    }
}

impl UpdateOperator {
    /// INC or DEC.
    pub fn token(self) -> Token {
        match self {
            UpdateOperator::Increment => Token::Inc,
            UpdateOperator::Decrement => Token::Dec,
        }
    }
}
