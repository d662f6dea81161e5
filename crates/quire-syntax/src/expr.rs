//! Typed expression views
//!
//! [`Expr`] is one tagged enum with a variant per grammar production. Each
//! variant wraps a small view type holding a handle to the untyped
//! [`SyntaxNode`], so a typed view never copies tree storage. Accessors read
//! straight from the underlying node.
//!
//! A view over a malformed node (for example a heading whose body failed to
//! parse) still answers every accessor with a neutral value instead of
//! failing.

use std::num::NonZeroUsize;

use typst_syntax::ast::{self, AstNode};

use crate::kind::SyntaxKind;
use crate::markup::Markup;
use crate::node::SyntaxNode;
use crate::span::Span;

pub use typst_syntax::ast::Unit;

/// Cast the untyped node into an engine view, falling back to the engine's
/// placeholder node when the kind does not match
fn cast<'a, T>(node: &'a SyntaxNode) -> T
where
    T: AstNode<'a> + Default,
{
    node.raw().cast().unwrap_or_default()
}

macro_rules! exprs {
    ($(
        $(#[$attr:meta])*
        $variant:ident($view:ident) = $kind:ident / $ast:ident;
    )*) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct $view(SyntaxNode);

            impl $view {
                /// The underlying node
                pub fn to_untyped(&self) -> &SyntaxNode {
                    &self.0
                }
            }
        )*

        /// An expression in markup, math or code
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Expr {
            $(
                $(#[$attr])*
                $variant($view),
            )*
        }

        impl Expr {
            /// View an untyped node as an expression
            ///
            /// Returns `None` when the node is not an expression, e.g. a
            /// comment or a keyword token.
            pub fn from_untyped(node: SyntaxNode) -> Option<Self> {
                match node.raw().kind() {
                    $(typst_syntax::SyntaxKind::$kind => Some(Self::$variant($view(node))),)*
                    _ => None,
                }
            }

            pub(crate) fn from_ast(parent: &SyntaxNode, expr: ast::Expr<'_>) -> Self {
                match expr {
                    $(ast::Expr::$ast(v) => {
                        Self::$variant($view(parent.child_of(v.to_untyped().clone())))
                    })*
                }
            }

            /// The variant tag, e.g. `Heading` or `FuncCall`
            pub fn variant(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($variant),)*
                }
            }

            /// The underlying node
            pub fn to_untyped(&self) -> &SyntaxNode {
                match self {
                    $(Self::$variant(v) => &v.0,)*
                }
            }
        }
    };
}

exprs! {
    /// Plain text without markup
    Text(Text) = Text / Text;
    /// Whitespace in markup or math
    Space(Space) = Space / Space;
    /// A forced line break: `\`
    Linebreak(Linebreak) = Linebreak / Linebreak;
    /// A paragraph break
    Parbreak(Parbreak) = Parbreak / Parbreak;
    /// An escape sequence: `\#`, `\u{1F5FA}`
    Escape(Escape) = Escape / Escape;
    /// A shorthand for a code point, e.g. `~` or `--`
    Shorthand(Shorthand) = Shorthand / Shorthand;
    /// A smart quote: `'` or `"`
    SmartQuote(SmartQuote) = SmartQuote / SmartQuote;
    /// Strong content: `*Strong*`
    Strong(Strong) = Strong / Strong;
    /// Emphasized content: `_Emphasized_`
    Emph(Emph) = Emph / Emph;
    /// Raw text: `` `code` ``
    Raw(Raw) = Raw / Raw;
    /// A hyperlink: `https://example.com`
    Link(Link) = Link / Link;
    /// A label: `<intro>`
    Label(Label) = Label / Label;
    /// A reference: `@target`
    Ref(Ref) = Ref / Ref;
    /// A section heading: `= Introduction`
    Heading(Heading) = Heading / Heading;
    /// A bullet list item: `- ...`
    ListItem(ListItem) = ListItem / List;
    /// A numbered list item: `+ ...` or `1. ...`
    EnumItem(EnumItem) = EnumItem / Enum;
    /// A term list item: `/ Term: Details`
    TermItem(TermItem) = TermItem / Term;
    /// An equation: `$x$`, `$ x^2 $`
    Equation(Equation) = Equation / Equation;
    /// The contents of an equation
    Math(Math) = Math / Math;
    /// An identifier in math: `pi`
    MathIdent(MathIdent) = MathIdent / MathIdent;
    /// An alignment point in math: `&`
    MathAlignPoint(MathAlignPoint) = MathAlignPoint / MathAlignPoint;
    /// Delimited math: `[x + y]`
    MathDelimited(MathDelimited) = MathDelimited / MathDelimited;
    /// A base with attachments: `a_1^2`
    MathAttach(MathAttach) = MathAttach / MathAttach;
    /// Primes: `a'`
    MathPrimes(MathPrimes) = MathPrimes / MathPrimes;
    /// A fraction: `x/2`
    MathFrac(MathFrac) = MathFrac / MathFrac;
    /// A root: `√x`, `∛x`
    MathRoot(MathRoot) = MathRoot / MathRoot;
    /// An identifier: `left`
    Ident(Ident) = Ident / Ident;
    /// The `none` literal
    None(NoneLiteral) = None / None;
    /// The `auto` literal
    Auto(AutoLiteral) = Auto / Auto;
    /// A boolean: `true`, `false`
    Bool(Bool) = Bool / Bool;
    /// An integer: `120`
    Int(Int) = Int / Int;
    /// A floating-point number: `1.2`, `10e-4`
    Float(Float) = Float / Float;
    /// A number with a unit: `12pt`, `3cm`, `50%`
    Numeric(Numeric) = Numeric / Numeric;
    /// A quoted string: `"..."`
    Str(Str) = Str / Str;
    /// A code block: `{ let x = 1; x + 2 }`
    CodeBlock(CodeBlock) = CodeBlock / Code;
    /// A content block: `[*Hi* there!]`
    ContentBlock(ContentBlock) = ContentBlock / Content;
    /// A grouped expression: `(1 + 2)`
    Parenthesized(Parenthesized) = Parenthesized / Parenthesized;
    /// An array: `(1, "hi", 12cm)`
    Array(Array) = Array / Array;
    /// A dictionary: `(thickness: 3pt, pattern: dashed)`
    Dict(Dict) = Dict / Dict;
    /// A unary operation: `-x`
    Unary(Unary) = Unary / Unary;
    /// A binary operation: `a + b`
    Binary(Binary) = Binary / Binary;
    /// A field access: `properties.age`
    FieldAccess(FieldAccess) = FieldAccess / FieldAccess;
    /// A function call: `f(x, y)`
    FuncCall(FuncCall) = FuncCall / FuncCall;
    /// A closure: `(x, y) => z`
    Closure(Closure) = Closure / Closure;
    /// A let binding: `let x = 1`
    LetBinding(LetBinding) = LetBinding / Let;
    /// A destructuring assignment: `(x, y) = (1, 2)`
    DestructAssign(DestructAssign) = DestructAssignment / DestructAssign;
    /// A set rule: `set text(...)`
    SetRule(SetRule) = SetRule / Set;
    /// A show rule: `show heading: it => emph(it.body)`
    ShowRule(ShowRule) = ShowRule / Show;
    /// A contextual expression: `context text.lang`
    Contextual(Contextual) = Contextual / Contextual;
    /// An if-else conditional: `if x { y } else { z }`
    Conditional(Conditional) = Conditional / Conditional;
    /// A while loop: `while x { y }`
    WhileLoop(WhileLoop) = WhileLoop / While;
    /// A for loop: `for x in y { z }`
    ForLoop(ForLoop) = ForLoop / For;
    /// A module import: `import "utils.typ": a, b`
    ModuleImport(ModuleImport) = ModuleImport / Import;
    /// A module include: `include "chapter1.typ"`
    ModuleInclude(ModuleInclude) = ModuleInclude / Include;
    /// A break from a loop: `break`
    LoopBreak(LoopBreak) = LoopBreak / Break;
    /// A continue in a loop: `continue`
    LoopContinue(LoopContinue) = LoopContinue / Continue;
    /// A return from a function: `return`, `return x + 1`
    FuncReturn(FuncReturn) = FuncReturn / Return;
}

impl Expr {
    /// The kind of the underlying node
    pub fn kind(&self) -> SyntaxKind {
        self.to_untyped().kind()
    }

    /// The source text of the expression
    pub fn text(&self) -> &str {
        self.to_untyped().source_text()
    }

    /// The location of the expression
    pub fn span(&self) -> Span {
        self.to_untyped().span()
    }

    /// Whether the expression is a literal (`none`, `auto`, booleans,
    /// numbers and strings)
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::None(_)
                | Self::Auto(_)
                | Self::Bool(_)
                | Self::Int(_)
                | Self::Float(_)
                | Self::Numeric(_)
                | Self::Str(_)
        )
    }
}

impl Text {
    pub fn get(&self) -> &str {
        cast::<ast::Text>(&self.0).get()
    }
}

impl Escape {
    /// The escaped character
    pub fn get(&self) -> char {
        cast::<ast::Escape>(&self.0).get()
    }
}

impl Shorthand {
    /// The character the shorthand stands for
    pub fn get(&self) -> char {
        cast::<ast::Shorthand>(&self.0).get()
    }
}

impl SmartQuote {
    /// Whether this is a double quote
    pub fn double(&self) -> bool {
        cast::<ast::SmartQuote>(&self.0).double()
    }
}

impl Strong {
    pub fn body(&self) -> Markup {
        markup(&self.0, cast::<ast::Strong>(&self.0).body())
    }
}

impl Emph {
    pub fn body(&self) -> Markup {
        markup(&self.0, cast::<ast::Emph>(&self.0).body())
    }
}

impl Raw {
    /// The trimmed lines of raw text
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        cast::<ast::Raw>(&self.0).lines().map(|line| line.get().as_str())
    }

    /// The language tag of a fenced block
    pub fn lang(&self) -> Option<&str> {
        cast::<ast::Raw>(&self.0)
            .lang()
            .map(|lang| lang.get().as_str())
    }

    /// Whether this is a block (three or more backticks)
    pub fn block(&self) -> bool {
        cast::<ast::Raw>(&self.0).block()
    }
}

impl Link {
    /// The URL
    pub fn get(&self) -> &str {
        cast::<ast::Link>(&self.0).get()
    }
}

impl Label {
    /// The label name without angle brackets
    pub fn get(&self) -> &str {
        cast::<ast::Label>(&self.0).get()
    }
}

impl Ref {
    /// The referenced label
    pub fn target(&self) -> &str {
        cast::<ast::Ref>(&self.0).target()
    }

    /// The supplement in brackets, if any
    pub fn supplement(&self) -> Option<ContentBlock> {
        cast::<ast::Ref>(&self.0)
            .supplement()
            .map(|block| ContentBlock(self.0.child_of(block.to_untyped().clone())))
    }
}

impl Heading {
    /// The heading level, at least one
    pub fn depth(&self) -> NonZeroUsize {
        cast::<ast::Heading>(&self.0).depth()
    }

    pub fn body(&self) -> Markup {
        markup(&self.0, cast::<ast::Heading>(&self.0).body())
    }
}

impl ListItem {
    pub fn body(&self) -> Markup {
        markup(&self.0, cast::<ast::ListItem>(&self.0).body())
    }
}

impl EnumItem {
    /// The explicit number, if given as in `5.`
    pub fn number(&self) -> Option<usize> {
        cast::<ast::EnumItem>(&self.0).number()
    }

    pub fn body(&self) -> Markup {
        markup(&self.0, cast::<ast::EnumItem>(&self.0).body())
    }
}

impl TermItem {
    pub fn term(&self) -> Markup {
        markup(&self.0, cast::<ast::TermItem>(&self.0).term())
    }

    pub fn description(&self) -> Markup {
        markup(&self.0, cast::<ast::TermItem>(&self.0).description())
    }
}

impl Equation {
    pub fn body(&self) -> Math {
        Math(child(&self.0, cast::<ast::Equation>(&self.0).body()))
    }

    /// Whether the equation is displayed on its own line
    pub fn block(&self) -> bool {
        cast::<ast::Equation>(&self.0).block()
    }
}

impl Math {
    /// The expressions inside the equation, including spaces
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        let parent = &self.0;
        cast::<ast::Math>(parent)
            .exprs()
            .map(move |expr| Expr::from_ast(parent, expr))
    }
}

impl MathIdent {
    pub fn get(&self) -> &str {
        cast::<ast::MathIdent>(&self.0).as_str()
    }
}

impl MathDelimited {
    /// The opening delimiter
    pub fn open(&self) -> Expr {
        expr(&self.0, cast::<ast::MathDelimited>(&self.0).open())
    }

    pub fn body(&self) -> Math {
        Math(child(&self.0, cast::<ast::MathDelimited>(&self.0).body()))
    }

    /// The closing delimiter
    pub fn close(&self) -> Expr {
        expr(&self.0, cast::<ast::MathDelimited>(&self.0).close())
    }
}

impl MathAttach {
    pub fn base(&self) -> Expr {
        expr(&self.0, cast::<ast::MathAttach>(&self.0).base())
    }

    /// The subscript
    pub fn bottom(&self) -> Option<Expr> {
        cast::<ast::MathAttach>(&self.0)
            .bottom()
            .map(|bottom| expr(&self.0, bottom))
    }

    /// The superscript
    pub fn top(&self) -> Option<Expr> {
        cast::<ast::MathAttach>(&self.0)
            .top()
            .map(|top| expr(&self.0, top))
    }

    pub fn primes(&self) -> Option<MathPrimes> {
        cast::<ast::MathAttach>(&self.0)
            .primes()
            .map(|primes| MathPrimes(child(&self.0, primes)))
    }
}

impl MathPrimes {
    pub fn count(&self) -> usize {
        cast::<ast::MathPrimes>(&self.0).count()
    }
}

impl MathFrac {
    /// The numerator
    pub fn num(&self) -> Expr {
        expr(&self.0, cast::<ast::MathFrac>(&self.0).num())
    }

    /// The denominator
    pub fn denom(&self) -> Expr {
        expr(&self.0, cast::<ast::MathFrac>(&self.0).denom())
    }
}

impl MathRoot {
    /// The root index, `3` for a cube root, `None` for a square root
    pub fn index(&self) -> Option<usize> {
        cast::<ast::MathRoot>(&self.0).index()
    }

    pub fn radicand(&self) -> Expr {
        expr(&self.0, cast::<ast::MathRoot>(&self.0).radicand())
    }
}

impl Ident {
    pub fn get(&self) -> &str {
        cast::<ast::Ident>(&self.0).as_str()
    }
}

impl Bool {
    pub fn get(&self) -> bool {
        cast::<ast::Bool>(&self.0).get()
    }
}

impl Int {
    pub fn get(&self) -> i64 {
        cast::<ast::Int>(&self.0).get()
    }
}

impl Float {
    pub fn get(&self) -> f64 {
        cast::<ast::Float>(&self.0).get()
    }
}

impl Numeric {
    /// The value and its unit
    pub fn get(&self) -> (f64, Unit) {
        cast::<ast::Numeric>(&self.0).get()
    }
}

impl Str {
    /// The string with escapes resolved
    pub fn get(&self) -> String {
        cast::<ast::Str>(&self.0).get().to_string()
    }
}

impl CodeBlock {
    /// The statements inside the braces
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        let parent = &self.0;
        cast::<ast::CodeBlock>(parent)
            .body()
            .exprs()
            .map(move |expr| Expr::from_ast(parent, expr))
    }
}

impl ContentBlock {
    pub fn body(&self) -> Markup {
        markup(&self.0, cast::<ast::ContentBlock>(&self.0).body())
    }
}

impl Parenthesized {
    /// The wrapped expression
    pub fn expr(&self) -> Expr {
        expr(&self.0, cast::<ast::Parenthesized>(&self.0).expr())
    }
}

/// An item of an array literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayItem {
    /// A bare expression: `12`
    Pos(Expr),
    /// A spread expression: `..things`
    Spread(Expr),
}

impl Array {
    pub fn items(&self) -> Vec<ArrayItem> {
        cast::<ast::Array>(&self.0)
            .items()
            .map(|item| match item {
                ast::ArrayItem::Pos(pos) => ArrayItem::Pos(expr(&self.0, pos)),
                ast::ArrayItem::Spread(spread) => {
                    ArrayItem::Spread(expr(&self.0, spread.expr()))
                }
            })
            .collect()
    }
}

/// An item of a dictionary literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictItem {
    /// A named pair: `thickness: 3pt`
    Named { name: String, expr: Expr },
    /// A keyed pair: `"spacy key": true`
    Keyed { key: Expr, expr: Expr },
    /// A spread expression: `..things`
    Spread(Expr),
}

impl Dict {
    pub fn items(&self) -> Vec<DictItem> {
        cast::<ast::Dict>(&self.0)
            .items()
            .map(|item| match item {
                ast::DictItem::Named(named) => DictItem::Named {
                    name: named.name().as_str().to_string(),
                    expr: expr(&self.0, named.expr()),
                },
                ast::DictItem::Keyed(keyed) => DictItem::Keyed {
                    key: expr(&self.0, keyed.key()),
                    expr: expr(&self.0, keyed.expr()),
                },
                ast::DictItem::Spread(spread) => DictItem::Spread(expr(&self.0, spread.expr())),
            })
            .collect()
    }
}

impl Unary {
    /// The operator, e.g. `-` or `not`
    pub fn op(&self) -> &'static str {
        cast::<ast::Unary>(&self.0).op().as_str()
    }

    /// The operand
    pub fn expr(&self) -> Expr {
        expr(&self.0, cast::<ast::Unary>(&self.0).expr())
    }
}

impl Binary {
    /// The operator, e.g. `+` or `and`
    pub fn op(&self) -> &'static str {
        cast::<ast::Binary>(&self.0).op().as_str()
    }

    pub fn lhs(&self) -> Expr {
        expr(&self.0, cast::<ast::Binary>(&self.0).lhs())
    }

    pub fn rhs(&self) -> Expr {
        expr(&self.0, cast::<ast::Binary>(&self.0).rhs())
    }
}

impl FieldAccess {
    /// The expression whose field is accessed
    pub fn target(&self) -> Expr {
        expr(&self.0, cast::<ast::FieldAccess>(&self.0).target())
    }

    /// The field name
    pub fn field(&self) -> &str {
        cast::<ast::FieldAccess>(&self.0).field().as_str()
    }
}

/// An argument of a function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A positional argument: `12`
    Pos(Expr),
    /// A named argument: `draw: false`
    Named { name: String, expr: Expr },
    /// A spread argument: `..things`
    Spread(Expr),
}

fn args(parent: &SyntaxNode, args: ast::Args<'_>) -> Vec<Arg> {
    args.items()
        .map(|arg| match arg {
            ast::Arg::Pos(pos) => Arg::Pos(expr(parent, pos)),
            ast::Arg::Named(named) => Arg::Named {
                name: named.name().as_str().to_string(),
                expr: expr(parent, named.expr()),
            },
            ast::Arg::Spread(spread) => Arg::Spread(expr(parent, spread.expr())),
        })
        .collect()
}

impl FuncCall {
    /// The function being called
    pub fn callee(&self) -> Expr {
        expr(&self.0, cast::<ast::FuncCall>(&self.0).callee())
    }

    pub fn args(&self) -> Vec<Arg> {
        args(&self.0, cast::<ast::FuncCall>(&self.0).args())
    }
}

impl Closure {
    /// The name of a named function, `None` for anonymous closures
    pub fn name(&self) -> Option<&str> {
        cast::<ast::Closure>(&self.0).name().map(|name| name.as_str())
    }

    pub fn body(&self) -> Expr {
        expr(&self.0, cast::<ast::Closure>(&self.0).body())
    }
}

impl LetBinding {
    /// The names bound by this let
    pub fn bindings(&self) -> Vec<&str> {
        cast::<ast::LetBinding>(&self.0)
            .kind()
            .bindings()
            .into_iter()
            .map(|ident| ident.as_str())
            .collect()
    }

    /// The initializer, if any
    pub fn init(&self) -> Option<Expr> {
        cast::<ast::LetBinding>(&self.0)
            .init()
            .map(|init| expr(&self.0, init))
    }
}

impl DestructAssign {
    /// The assigned value
    pub fn value(&self) -> Expr {
        expr(&self.0, cast::<ast::DestructAssignment>(&self.0).value())
    }
}

impl SetRule {
    /// The function whose properties are set
    pub fn target(&self) -> Expr {
        expr(&self.0, cast::<ast::SetRule>(&self.0).target())
    }

    pub fn args(&self) -> Vec<Arg> {
        args(&self.0, cast::<ast::SetRule>(&self.0).args())
    }

    /// The `if` condition of a conditional set rule
    pub fn condition(&self) -> Option<Expr> {
        cast::<ast::SetRule>(&self.0)
            .condition()
            .map(|condition| expr(&self.0, condition))
    }
}

impl ShowRule {
    /// The selector, `None` for show-everything rules
    pub fn selector(&self) -> Option<Expr> {
        cast::<ast::ShowRule>(&self.0)
            .selector()
            .map(|selector| expr(&self.0, selector))
    }

    pub fn transform(&self) -> Expr {
        expr(&self.0, cast::<ast::ShowRule>(&self.0).transform())
    }
}

impl Contextual {
    pub fn body(&self) -> Expr {
        expr(&self.0, cast::<ast::Contextual>(&self.0).body())
    }
}

impl Conditional {
    pub fn condition(&self) -> Expr {
        expr(&self.0, cast::<ast::Conditional>(&self.0).condition())
    }

    pub fn if_body(&self) -> Expr {
        expr(&self.0, cast::<ast::Conditional>(&self.0).if_body())
    }

    pub fn else_body(&self) -> Option<Expr> {
        cast::<ast::Conditional>(&self.0)
            .else_body()
            .map(|body| expr(&self.0, body))
    }
}

impl WhileLoop {
    pub fn condition(&self) -> Expr {
        expr(&self.0, cast::<ast::WhileLoop>(&self.0).condition())
    }

    pub fn body(&self) -> Expr {
        expr(&self.0, cast::<ast::WhileLoop>(&self.0).body())
    }
}

impl ForLoop {
    /// The names bound in each iteration
    pub fn bindings(&self) -> Vec<&str> {
        cast::<ast::ForLoop>(&self.0)
            .pattern()
            .bindings()
            .into_iter()
            .map(|ident| ident.as_str())
            .collect()
    }

    pub fn iterable(&self) -> Expr {
        expr(&self.0, cast::<ast::ForLoop>(&self.0).iterable())
    }

    pub fn body(&self) -> Expr {
        expr(&self.0, cast::<ast::ForLoop>(&self.0).body())
    }
}

impl ModuleImport {
    /// The module path or expression
    pub fn source(&self) -> Expr {
        expr(&self.0, cast::<ast::ModuleImport>(&self.0).source())
    }

    /// The name given with `as`
    pub fn new_name(&self) -> Option<&str> {
        cast::<ast::ModuleImport>(&self.0)
            .new_name()
            .map(|name| name.as_str())
    }
}

impl ModuleInclude {
    /// The module path or expression
    pub fn source(&self) -> Expr {
        expr(&self.0, cast::<ast::ModuleInclude>(&self.0).source())
    }
}

impl FuncReturn {
    /// The returned expression, if any
    pub fn body(&self) -> Option<Expr> {
        cast::<ast::FuncReturn>(&self.0)
            .body()
            .map(|body| expr(&self.0, body))
    }
}

fn child<'a, T: AstNode<'a>>(parent: &SyntaxNode, view: T) -> SyntaxNode {
    parent.child_of(view.to_untyped().clone())
}

fn markup(parent: &SyntaxNode, view: ast::Markup<'_>) -> Markup {
    Markup::new(child(parent, view))
}

fn expr(parent: &SyntaxNode, view: ast::Expr<'_>) -> Expr {
    Expr::from_ast(parent, view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn first(text: &str) -> Expr {
        parse(text).exprs().next().unwrap()
    }

    fn code(text: &str) -> Expr {
        match first(text) {
            Expr::CodeBlock(block) => block.exprs().next().unwrap(),
            other => other,
        }
    }

    #[test]
    fn test_heading() {
        let Expr::Heading(heading) = first("== Intro *now*") else {
            panic!("expected heading");
        };
        assert_eq!(heading.depth().get(), 2);
        let body: Vec<_> = heading.body().exprs().map(|e| e.variant()).collect();
        assert_eq!(body, vec!["Text", "Strong"]);
    }

    #[test]
    fn test_strong_and_emph() {
        let Expr::Strong(strong) = first("*bold _both_*") else {
            panic!("expected strong");
        };
        let inner: Vec<_> = strong.body().exprs().collect();
        assert_eq!(inner[0].variant(), "Text");
        let Expr::Emph(emph) = &inner[1] else {
            panic!("expected emph");
        };
        assert_eq!(emph.body().text(), "both");
    }

    #[test]
    fn test_lists() {
        let items: Vec<_> = parse("- one\n+ two\n5. five\n/ Term: desc")
            .exprs()
            .collect();
        assert_eq!(
            items.iter().map(Expr::variant).collect::<Vec<_>>(),
            vec!["ListItem", "EnumItem", "EnumItem", "TermItem"]
        );

        let Expr::EnumItem(auto) = &items[1] else { panic!() };
        assert_eq!(auto.number(), None);
        let Expr::EnumItem(explicit) = &items[2] else { panic!() };
        assert_eq!(explicit.number(), Some(5));
        let Expr::TermItem(term) = &items[3] else { panic!() };
        assert_eq!(term.term().text().trim(), "Term");
        assert_eq!(term.description().text().trim(), "desc");
    }

    #[test]
    fn test_raw() {
        let Expr::Raw(raw) = first("```rust\nfn main() {}\n```") else {
            panic!("expected raw");
        };
        assert!(raw.block());
        assert_eq!(raw.lang(), Some("rust"));
        assert_eq!(raw.lines().collect::<Vec<_>>(), vec!["fn main() {}"]);

        let Expr::Raw(inline) = first("`x`") else { panic!() };
        assert!(!inline.block());
        assert_eq!(inline.lang(), None);
    }

    #[test]
    fn test_equation() {
        let Expr::Equation(inline) = first("$x^2$") else { panic!() };
        assert!(!inline.block());
        let Expr::MathAttach(attach) = inline.body().exprs().next().unwrap() else {
            panic!("expected attachment");
        };
        assert_eq!(attach.base().text(), "x");
        assert_eq!(attach.top().map(|top| top.text().to_string()), Some("2".into()));

        let Expr::Equation(block) = first("$ x $") else { panic!() };
        assert!(block.block());
    }

    #[test]
    fn test_scalars() {
        let Expr::Link(link) = first("https://example.com") else { panic!() };
        assert_eq!(link.get(), "https://example.com");

        let Expr::Label(label) = first("<intro>") else { panic!() };
        assert_eq!(label.get(), "intro");

        let Expr::Ref(reference) = first("@intro") else { panic!() };
        assert_eq!(reference.target(), "intro");

        let Expr::Escape(escape) = first("\\#") else { panic!() };
        assert_eq!(escape.get(), '#');

        let Expr::Shorthand(shorthand) = first("~") else { panic!() };
        assert_eq!(shorthand.get(), '\u{a0}');

        let Expr::SmartQuote(quote) = first("\"") else { panic!() };
        assert!(quote.double());
    }

    #[test]
    fn test_literals() {
        let Expr::Int(int) = code("#{ 42 }") else { panic!() };
        assert_eq!(int.get(), 42);

        let Expr::Float(float) = code("#{ 1.5 }") else { panic!() };
        assert_eq!(float.get(), 1.5);

        let Expr::Numeric(numeric) = code("#{ 12pt }") else { panic!() };
        assert_eq!(numeric.get(), (12.0, Unit::Pt));

        let Expr::Str(string) = code("#{ \"a\\tb\" }") else { panic!() };
        assert_eq!(string.get(), "a\tb");

        let Expr::Bool(boolean) = code("#{ true }") else { panic!() };
        assert!(boolean.get());

        assert_eq!(code("#{ none }").variant(), "None");
        assert_eq!(code("#{ auto }").variant(), "Auto");
        assert!(code("#{ none }").is_literal());
    }

    #[test]
    fn test_code_structures() {
        let Expr::LetBinding(binding) = first("#let x = 1 + 2") else { panic!() };
        assert_eq!(binding.bindings(), vec!["x"]);
        let Some(Expr::Binary(sum)) = binding.init() else { panic!() };
        assert_eq!(sum.op(), "+");
        assert_eq!(sum.lhs().text(), "1");
        assert_eq!(sum.rhs().text(), "2");

        let Expr::FuncCall(call) = first("#text(red, size: 12pt)[Hi]") else { panic!() };
        assert_eq!(call.callee().text(), "text");
        let args = call.args();
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[1], Arg::Named { name, .. } if name == "size"));

        let Expr::Conditional(cond) = first("#if x { 1 } else { 2 }") else { panic!() };
        assert_eq!(cond.condition().text(), "x");
        assert!(cond.else_body().is_some());

        let Expr::ForLoop(for_loop) = first("#for i in range(3) [#i]") else { panic!() };
        assert_eq!(for_loop.bindings(), vec!["i"]);
        assert_eq!(for_loop.iterable().variant(), "FuncCall");

        let Expr::ShowRule(show) = first("#show heading: it => it.body") else { panic!() };
        assert_eq!(show.selector().map(|s| s.text().to_string()), Some("heading".into()));
        assert_eq!(show.transform().variant(), "Closure");

        let Expr::ModuleImport(import) = first("#import \"utils.typ\" as u") else { panic!() };
        assert_eq!(import.source().variant(), "Str");
        assert_eq!(import.new_name(), Some("u"));
    }

    #[test]
    fn test_collections() {
        let Expr::Array(array) = code("#{ (1, ..rest) }") else { panic!() };
        let items = array.items();
        assert!(matches!(&items[0], ArrayItem::Pos(Expr::Int(_))));
        assert!(matches!(&items[1], ArrayItem::Spread(Expr::Ident(_))));

        let Expr::Dict(dict) = code("#{ (a: 1, \"b c\": 2) }") else { panic!() };
        let items = dict.items();
        assert!(matches!(&items[0], DictItem::Named { name, .. } if name == "a"));
        assert!(matches!(&items[1], DictItem::Keyed { .. }));
    }

    #[test]
    fn test_variant_matches_kind() {
        let markup = parse("= A\n*b* _c_ `d` $e$ @f <g> #h #let i = 1");
        for expr in markup.exprs() {
            let again = Expr::from_untyped(expr.to_untyped().clone()).unwrap();
            assert_eq!(again.variant(), expr.variant());
            assert_eq!(again.kind(), expr.kind());
        }
    }

    #[test]
    fn test_from_untyped_rejects_non_expressions() {
        let markup = parse("a // note");
        let comment = markup
            .to_untyped()
            .children()
            .find(|node| node.kind().name() == "line comment")
            .unwrap();
        assert!(Expr::from_untyped(comment).is_none());
    }
}
