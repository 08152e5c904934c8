//! Syntax kinds for the Flylang concrete syntax tree.
//!
//! One flat `u16` enum covering both token kinds (mirroring
//! `fly_common::token::TokenKind`) and composite node kinds. Token kinds come
//! first; everything from `SOURCE_FILE` down is a node.

use fly_common::token::TokenKind;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    // ── Tokens: keywords ─────────────────────────────────────────────
    MODULE_KW,
    USE_KW,
    AS_KW,
    PUB_KW,
    STATIC_KW,
    FN_KW,
    LET_KW,
    MUT_KW,
    CLASS_KW,
    INTERFACE_KW,
    ENUM_KW,
    DATA_KW,
    STRUCT_KW,
    SPARK_KW,
    TRAIT_KW,
    IMPL_KW,
    TYPE_KW,
    PROTOCOL_KW,
    EXTEND_KW,
    CONTEXT_KW,
    SUPERVISOR_KW,
    FLOW_KW,
    MACRO_KW,
    EXCEPTION_KW,
    IF_KW,
    ELSE_KW,
    MATCH_KW,
    WHEN_KW,
    FOR_KW,
    WHILE_KW,
    IN_KW,
    RETURN_KW,
    BREAK_KW,
    CONTINUE_KW,
    ASYNC_KW,
    AWAIT_KW,
    CONCURRENT_KW,
    RACE_KW,
    TIMEOUT_KW,
    WITH_KW,
    REQUIRES_KW,
    THROW_KW,
    TRY_KW,
    CATCH_KW,
    FINALLY_KW,
    NEW_KW,
    IS_KW,
    SELF_KW,
    TRUE_KW,
    FALSE_KW,
    NONE_KW,
    VALIDATE_KW,
    BEFORE_KW,
    AFTER_KW,
    UPDATE_KW,
    COMPUTED_KW,

    // ── Tokens: punctuation ──────────────────────────────────────────
    L_PAREN,
    R_PAREN,
    L_BRACE,
    R_BRACE,
    L_BRACKET,
    R_BRACKET,
    COMMA,
    COLON,
    COLON_COLON,
    SEMICOLON,
    DOT,
    DOT_DOT,
    DOT_DOT_EQ,
    ARROW,
    FAT_ARROW,
    AT,
    UNDERSCORE,

    // ── Tokens: operators ────────────────────────────────────────────
    EQ,
    EQ_EQ,
    NOT_EQ,
    LT,
    GT,
    LT_EQ,
    GT_EQ,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    PERCENT,
    STAR_STAR,
    BANG,
    BANG_BANG,
    QUESTION,
    QUESTION_DOT,
    QUESTION_QUESTION,
    QUESTION_COLON,
    AMP,
    AMP_AMP,
    PIPE,
    PIPE_PIPE,
    CARET,
    PLUS_EQ,
    MINUS_EQ,
    STAR_EQ,
    SLASH_EQ,
    PERCENT_EQ,

    // ── Tokens: identifiers, literals, misc ──────────────────────────
    IDENT,
    TYPE_IDENT,
    INT_LIT,
    FLOAT_LIT,
    STRING_LIT,
    INTERP_STRING_LIT,
    CHAR_LIT,
    DOC_COMMENT,
    WHITESPACE,
    ERROR_TOKEN,
    EOF,

    // ── Nodes: structure ─────────────────────────────────────────────
    SOURCE_FILE,
    MODULE_HEADER,
    PATH,
    USE_DECL,
    USE_ITEM,
    USE_ITEM_LIST,
    USE_ALIAS,
    USE_STAR,
    ANNOTATION,
    VISIBILITY,
    NAME,
    NAME_REF,
    TYPE_PARAM_LIST,
    TYPE_PARAM,
    PARAM_LIST,
    PARAM,
    RETURN_TYPE,
    EFFECT_CLAUSE,
    REQUIRES_CLAUSE,
    SUPER_LIST,

    // ── Nodes: declarations ──────────────────────────────────────────
    CLASS_DECL,
    INTERFACE_DECL,
    ENUM_DECL,
    ENUM_VARIANT,
    DATA_DECL,
    DATA_VARIANT,
    RECORD_FIELD_LIST,
    RECORD_FIELD,
    STRUCT_DECL,
    SPARK_DECL,
    VALIDATE_BLOCK,
    BEFORE_UPDATE_BLOCK,
    AFTER_UPDATE_BLOCK,
    COMPUTED_PROP,
    TRAIT_DECL,
    PROTOCOL_DECL,
    IMPL_DECL,
    TYPE_ALIAS_DECL,
    EXTEND_DECL,
    CONTEXT_DECL,
    SUPERVISOR_DECL,
    FLOW_DECL,
    MACRO_DECL,
    MACRO_BODY,
    EXCEPTION_DECL,
    FN_DECL,
    FIELD_DECL,

    // ── Nodes: types ─────────────────────────────────────────────────
    PRIMITIVE_TYPE,
    NAMED_TYPE,
    GENERIC_ARG_LIST,
    OPTIONAL_TYPE,
    ARRAY_TYPE,
    MAP_TYPE,
    REF_TYPE,
    FN_TYPE,
    FN_TYPE_PARAMS,
    TUPLE_TYPE,
    UNION_TYPE,
    INTERSECTION_TYPE,

    // ── Nodes: statements & expressions ──────────────────────────────
    BLOCK,
    LET_STMT,
    EXPR_STMT,
    LITERAL,
    INTERP_STRING_EXPR,
    PATH_EXPR,
    SELF_EXPR,
    PAREN_EXPR,
    TUPLE_EXPR,
    ARRAY_LITERAL,
    MAP_LITERAL,
    MAP_ENTRY,
    STRUCT_LITERAL,
    STRUCT_LIT_FIELD,
    BINARY_EXPR,
    UNARY_EXPR,
    RANGE_EXPR,
    CALL_EXPR,
    ARG_LIST,
    FIELD_ACCESS,
    SAFE_ACCESS,
    INDEX_EXPR,
    AWAIT_EXPR,
    UNWRAP_EXPR,
    FORCE_UNWRAP_EXPR,
    CAST_EXPR,
    TYPE_CHECK_EXPR,
    IF_EXPR,
    LET_CONDITION,
    WHILE_EXPR,
    FOR_EXPR,
    MATCH_EXPR,
    MATCH_ARM_LIST,
    MATCH_ARM,
    GUARD_CLAUSE,
    LAMBDA_EXPR,
    LAMBDA_PARAM_LIST,
    RETURN_EXPR,
    BREAK_EXPR,
    CONTINUE_EXPR,
    THROW_EXPR,
    TRY_EXPR,
    CATCH_CLAUSE,
    FINALLY_CLAUSE,
    CONCURRENT_EXPR,
    CONCURRENT_BINDING,
    RACE_EXPR,
    TIMEOUT_EXPR,
    WITH_EXPR,
    NEW_EXPR,

    // ── Nodes: patterns ──────────────────────────────────────────────
    LITERAL_PAT,
    BINDING_PAT,
    STRUCT_PAT,
    STRUCT_PAT_FIELD,
    TUPLE_STRUCT_PAT,
    TUPLE_PAT,
    ARRAY_PAT,
    REST_PAT,
    RANGE_PAT,
    WILDCARD_PAT,
    OR_PAT,
    GUARD_PAT,

    // ── Bookkeeping ──────────────────────────────────────────────────
    ERROR_NODE,
    TOMBSTONE,
    __LAST,
}

impl SyntaxKind {
    pub fn from_raw(raw: u16) -> SyntaxKind {
        assert!(raw < SyntaxKind::__LAST as u16);
        // Safe: repr(u16) with contiguous discriminants starting at 0.
        unsafe { std::mem::transmute(raw) }
    }

    pub fn is_token(self) -> bool {
        self < SyntaxKind::SOURCE_FILE
    }

    /// The CST kind of a lexed token.
    pub fn from_token(kind: TokenKind) -> SyntaxKind {
        use SyntaxKind as K;
        use TokenKind as T;
        match kind {
            T::ModuleKw => K::MODULE_KW,
            T::UseKw => K::USE_KW,
            T::AsKw => K::AS_KW,
            T::PubKw => K::PUB_KW,
            T::StaticKw => K::STATIC_KW,
            T::FnKw => K::FN_KW,
            T::LetKw => K::LET_KW,
            T::MutKw => K::MUT_KW,
            T::ClassKw => K::CLASS_KW,
            T::InterfaceKw => K::INTERFACE_KW,
            T::EnumKw => K::ENUM_KW,
            T::DataKw => K::DATA_KW,
            T::StructKw => K::STRUCT_KW,
            T::SparkKw => K::SPARK_KW,
            T::TraitKw => K::TRAIT_KW,
            T::ImplKw => K::IMPL_KW,
            T::TypeKw => K::TYPE_KW,
            T::ProtocolKw => K::PROTOCOL_KW,
            T::ExtendKw => K::EXTEND_KW,
            T::ContextKw => K::CONTEXT_KW,
            T::SupervisorKw => K::SUPERVISOR_KW,
            T::FlowKw => K::FLOW_KW,
            T::MacroKw => K::MACRO_KW,
            T::ExceptionKw => K::EXCEPTION_KW,
            T::IfKw => K::IF_KW,
            T::ElseKw => K::ELSE_KW,
            T::MatchKw => K::MATCH_KW,
            T::WhenKw => K::WHEN_KW,
            T::ForKw => K::FOR_KW,
            T::WhileKw => K::WHILE_KW,
            T::InKw => K::IN_KW,
            T::ReturnKw => K::RETURN_KW,
            T::BreakKw => K::BREAK_KW,
            T::ContinueKw => K::CONTINUE_KW,
            T::AsyncKw => K::ASYNC_KW,
            T::AwaitKw => K::AWAIT_KW,
            T::ConcurrentKw => K::CONCURRENT_KW,
            T::RaceKw => K::RACE_KW,
            T::TimeoutKw => K::TIMEOUT_KW,
            T::WithKw => K::WITH_KW,
            T::RequiresKw => K::REQUIRES_KW,
            T::ThrowKw => K::THROW_KW,
            T::TryKw => K::TRY_KW,
            T::CatchKw => K::CATCH_KW,
            T::FinallyKw => K::FINALLY_KW,
            T::NewKw => K::NEW_KW,
            T::IsKw => K::IS_KW,
            T::SelfKw => K::SELF_KW,
            T::TrueKw => K::TRUE_KW,
            T::FalseKw => K::FALSE_KW,
            T::NoneKw => K::NONE_KW,
            T::ValidateKw => K::VALIDATE_KW,
            T::BeforeKw => K::BEFORE_KW,
            T::AfterKw => K::AFTER_KW,
            T::UpdateKw => K::UPDATE_KW,
            T::ComputedKw => K::COMPUTED_KW,
            T::LParen => K::L_PAREN,
            T::RParen => K::R_PAREN,
            T::LBrace => K::L_BRACE,
            T::RBrace => K::R_BRACE,
            T::LBracket => K::L_BRACKET,
            T::RBracket => K::R_BRACKET,
            T::Comma => K::COMMA,
            T::Colon => K::COLON,
            T::ColonColon => K::COLON_COLON,
            T::Semicolon => K::SEMICOLON,
            T::Dot => K::DOT,
            T::DotDot => K::DOT_DOT,
            T::DotDotEq => K::DOT_DOT_EQ,
            T::Arrow => K::ARROW,
            T::FatArrow => K::FAT_ARROW,
            T::At => K::AT,
            T::Underscore => K::UNDERSCORE,
            T::Eq => K::EQ,
            T::EqEq => K::EQ_EQ,
            T::NotEq => K::NOT_EQ,
            T::Lt => K::LT,
            T::Gt => K::GT,
            T::Le => K::LT_EQ,
            T::Ge => K::GT_EQ,
            T::Plus => K::PLUS,
            T::Minus => K::MINUS,
            T::Star => K::STAR,
            T::Slash => K::SLASH,
            T::Percent => K::PERCENT,
            T::StarStar => K::STAR_STAR,
            T::Bang => K::BANG,
            T::BangBang => K::BANG_BANG,
            T::Question => K::QUESTION,
            T::QuestionDot => K::QUESTION_DOT,
            T::QuestionQuestion => K::QUESTION_QUESTION,
            T::QuestionColon => K::QUESTION_COLON,
            T::Amp => K::AMP,
            T::AmpAmp => K::AMP_AMP,
            T::Pipe => K::PIPE,
            T::PipePipe => K::PIPE_PIPE,
            T::Caret => K::CARET,
            T::PlusEq => K::PLUS_EQ,
            T::MinusEq => K::MINUS_EQ,
            T::StarEq => K::STAR_EQ,
            T::SlashEq => K::SLASH_EQ,
            T::PercentEq => K::PERCENT_EQ,
            T::Ident => K::IDENT,
            T::TypeIdent => K::TYPE_IDENT,
            T::IntLit => K::INT_LIT,
            T::FloatLit => K::FLOAT_LIT,
            T::StringLit => K::STRING_LIT,
            T::InterpStringLit => K::INTERP_STRING_LIT,
            T::CharLit => K::CHAR_LIT,
            T::DocComment => K::DOC_COMMENT,
            T::Error => K::ERROR_TOKEN,
            T::Eof => K::EOF,
        }
    }

    /// Tokens that may start a top-level declaration; used for panic-mode
    /// recovery at declaration boundaries.
    pub fn starts_decl(self) -> bool {
        use SyntaxKind::*;
        matches!(
            self,
            PUB_KW
                | STATIC_KW
                | ASYNC_KW
                | FN_KW
                | CLASS_KW
                | INTERFACE_KW
                | ENUM_KW
                | DATA_KW
                | STRUCT_KW
                | SPARK_KW
                | TRAIT_KW
                | IMPL_KW
                | TYPE_KW
                | PROTOCOL_KW
                | EXTEND_KW
                | CONTEXT_KW
                | SUPERVISOR_KW
                | FLOW_KW
                | MACRO_KW
                | EXCEPTION_KW
                | USE_KW
                | MODULE_KW
                | AT
                | DOC_COMMENT
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        rowan::SyntaxKind(kind as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        for raw in 0..SyntaxKind::__LAST as u16 {
            let kind = SyntaxKind::from_raw(raw);
            assert_eq!(kind as u16, raw);
        }
    }

    #[test]
    fn tokens_precede_nodes() {
        assert!(SyntaxKind::IDENT.is_token());
        assert!(SyntaxKind::EOF.is_token());
        assert!(!SyntaxKind::SOURCE_FILE.is_token());
        assert!(!SyntaxKind::MATCH_ARM.is_token());
    }
}
