use std::borrow::Cow;

use smallvec::SmallVec;

use crate::{
    key::KeyOps,
    token::{SpannedToken, Token},
    Diagnostic,
};

use super::*;

/// Parses a single Go source file, stopping at the first syntax error.
pub fn parse(source: &str) -> crate::Result<File> {
    let tokens = crate::token::tokenize(source);

    let mut parser = Parser {
        tokens: &tokens,
        source,
        current_token: 0,
        diagnostics: Vec::new(),
        nodes: NodeStorage::default(),
        names: Interner::new(),
        indirect_stack: Vec::new(),
        no_composite: false,
    };

    match parser.file() {
        Ok(file) => Ok(file),
        Err(()) => {
            let end = source.len();
            let fallback = || syntax_error!(FileRange::from(end..end), "invalid syntax");
            Err(parser.diagnostics.into_iter().next().unwrap_or_else(fallback))
        }
    }
}

struct Parser<'a> {
    /// Tracks all emitted errors
    diagnostics: Vec<Diagnostic>,

    /// List of tokens in the current file.
    tokens: &'a [SpannedToken],

    /// Text from which the tokens were derived
    source: &'a str,

    /// Index of the token at the current position
    current_token: usize,

    nodes: NodeStorage,
    names: Interner,

    /// A stack of nodes which can be used to build up contiguous regions of nodes. Any function
    /// that pushes to it has to pop its own entries before returning.
    indirect_stack: Vec<NodeId>,

    /// Set in the header of `if`, `for` and `switch` statements, where a `{` following a type
    /// name starts the body instead of a composite literal.
    no_composite: bool,
}

type Result<T, E = ()> = std::result::Result<T, E>;

impl<'a> Parser<'a> {
    fn advance(&mut self) {
        self.current_token += 1;
    }

    fn peek(&self) -> Option<SpannedToken> {
        self.tokens.get(self.current_token).copied()
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|token| token.token)
    }

    fn try_peek(&self, token: Token) -> Option<SpannedToken> {
        let next = self.peek()?;
        if next.token == token {
            Some(next)
        } else {
            None
        }
    }

    fn peek_is(&self, token: Token) -> bool {
        self.try_peek(token).is_some()
    }

    fn peek2_is(&self, token: Token) -> bool {
        self.tokens
            .get(self.current_token + 1)
            .map_or(false, |next| next.token == token)
    }

    fn try_expect(&mut self, token: Token) -> Option<SpannedToken> {
        let token = self.try_peek(token)?;
        self.advance();
        Some(token)
    }

    fn expect(&mut self, token: Token) -> Result<SpannedToken> {
        match self.try_expect(token) {
            Some(token) => Ok(token),
            None => Err(self.emit_expected(&format!("`{}`", token.display()))),
        }
    }

    fn eat(&mut self, token: Token) -> bool {
        self.try_expect(token).is_some()
    }

    /// Statements end with a semicolon, which may be omitted before a closing `)` or `}`.
    fn expect_terminator(&mut self) -> Result<()> {
        match self.peek_token() {
            None | Some(Token::RParens | Token::RCurly) => Ok(()),
            _ => self.expect(Token::SemiColon).map(|_| ()),
        }
    }

    fn unexpected_range(&self) -> FileRange {
        match self.peek() {
            Some(token) => token.range,
            None => {
                let end = self.source.len();
                FileRange::from(end..end)
            }
        }
    }

    fn emit_expected(&mut self, expected: &str) {
        let found = match self.peek() {
            Some(token) if token.is_implicit() => Cow::Borrowed("newline"),
            Some(token) => Cow::Owned(format!("`{}`", self.snippet(token.range))),
            None => Cow::Borrowed("end of file"),
        };

        let range = self.unexpected_range();
        let diagnostic = syntax_error!(range, "expected {expected}, found {found}");
        self.diagnostics.push(diagnostic);
    }

    fn snippet(&self, range: FileRange) -> Cow<'a, str> {
        let text = &self.source[range.slice_range()];
        if text.len() < 32 {
            return Cow::Borrowed(text);
        }

        let mut chars = text.chars();
        for _ in chars.by_ref().take(32).take_while(|ch| !ch.is_whitespace()) {}
        let rest = chars.as_str().len();
        Cow::Owned(format!("{}...", &text[..text.len() - rest]))
    }

    fn node_span(&self, node: NodeId) -> FileRange {
        self.nodes.span(node)
    }

    fn emit_node(&mut self, node: Node, range: FileRange) -> NodeId {
        let id = self.nodes.kinds.push(node);
        let span = self.nodes.spans.push(range);
        debug_assert_eq!(id.index(), span.index());
        id
    }

    fn push_indirect(&mut self, node: NodeId) {
        self.indirect_stack.push(node);
    }

    fn pop_indirect(&mut self, base: usize) -> NodeRange {
        let start = self.nodes.indirect.len();
        let length = self.indirect_stack.len() - base;
        self.nodes
            .indirect
            .extend_from_slice(&self.indirect_stack[base..]);
        self.indirect_stack.truncate(base);
        NodeRange {
            start: start as u32,
            length: length as u32,
        }
    }

    fn multi(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<NodeRange> {
        let base = self.indirect_stack.len();
        let result = f(self);
        let range = self.pop_indirect(base);
        let () = result?;
        Ok(range)
    }

    fn node_range_span(&self, range: NodeRange) -> Option<FileRange> {
        let nodes = self.nodes.indirect(range);
        let first = self.node_span(*nodes.first()?);
        let last = self.node_span(*nodes.last()?);
        Some(first.join(last))
    }

    fn file(&mut self) -> Result<File> {
        self.expect(Token::Package)?;
        let package = self.identifier()?;
        self.expect_terminator()?;

        let imports = self.imports()?;

        let mut declarations = Vec::new();
        while self.peek().is_some() {
            self.declaration(&mut declarations)?;
            self.expect_terminator()?;
            if self.peek_is(Token::RParens) || self.peek_is(Token::RCurly) {
                return Err(self.emit_expected("a declaration"));
            }
        }

        Ok(File {
            source: self.source.into(),
            package,
            imports,
            declarations,
            nodes: std::mem::take(&mut self.nodes),
            names: std::mem::take(&mut self.names),
        })
    }

    fn identifier(&mut self) -> Result<Identifier> {
        let token = self.expect(Token::Identifier)?;
        let text = self.names.intern(&self.source[token.range.slice_range()]);
        Ok(Identifier {
            text,
            range: token.range,
        })
    }

    fn name_node(&mut self, identifier: Identifier) -> NodeId {
        self.emit_node(Node::Name(identifier.text), identifier.range)
    }

    fn imports(&mut self) -> Result<Vec<Import>> {
        let mut imports = Vec::new();

        while self.eat(Token::Import) {
            if self.eat(Token::LParens) {
                while !self.eat(Token::RParens) {
                    imports.push(self.import_spec()?);
                    if !self.eat(Token::SemiColon) {
                        self.expect(Token::RParens)?;
                        break;
                    }
                }
            } else {
                imports.push(self.import_spec()?);
            }
            self.expect_terminator()?;
        }

        Ok(imports)
    }

    fn import_spec(&mut self) -> Result<Import> {
        let start = self.unexpected_range();

        let mut explicit = None;
        if self.peek_is(Token::Identifier) {
            explicit = Some(self.identifier()?.text);
        } else if self.eat(Token::Dot) {
            explicit = Some(Text::BLANK);
        }

        let Some(path) = self
            .try_expect(Token::String)
            .or_else(|| self.try_expect(Token::RawString))
        else {
            return Err(self.emit_expected("an import path"));
        };

        let text = &self.source[path.range.slice_range()];
        let path_text = text.get(1..text.len().saturating_sub(1)).unwrap_or("");

        let name = match explicit {
            Some(name) if name.is_blank() => None,
            Some(name) => Some(name),
            None => {
                let last = path_text.rsplit('/').next().unwrap_or(path_text);
                Some(self.names.intern(last))
            }
        };

        Ok(Import {
            name,
            path: path_text.into(),
            range: start.join(path.range),
        })
    }

    fn declaration(&mut self, declarations: &mut Vec<NodeId>) -> Result<()> {
        match self.peek_token() {
            Some(Token::Func) => declarations.push(self.function_decl()?),
            Some(Token::Var | Token::Const | Token::Type) => {
                let (specs, _) = self.decl_specs()?;
                declarations.extend_from_slice(self.nodes.indirect(specs));
            }
            _ => return Err(self.emit_expected("a declaration")),
        }
        Ok(())
    }

    fn function_decl(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::Func)?.range;

        let receiver = if self.peek_is(Token::LParens) {
            Some(self.receiver()?)
        } else {
            None
        };

        let name = self.identifier()?;
        let name = self.name_node(name);
        let (signature, signature_range) = self.signature()?;

        let body = if self.peek_is(Token::LCurly) {
            Some(self.block()?)
        } else {
            None
        };

        let end = body.map_or(signature_range, |body| self.node_span(body));
        let decl = FuncDecl {
            receiver,
            name,
            signature,
            body,
        };
        Ok(self.emit_node(Node::Function(decl), start.join(end)))
    }

    fn receiver(&mut self) -> Result<NodeId> {
        let start = self.unexpected_range();
        let parameters = self.multi(|this| this.push_parameter_list().map(|_| ()))?;
        match self.nodes.indirect(parameters) {
            [receiver] => Ok(*receiver),
            _ => {
                let diagnostic = syntax_error!(start, "method must have exactly one receiver");
                self.diagnostics.push(diagnostic);
                Err(())
            }
        }
    }

    /// Parses `var`, `const` and `type` declarations, returning one node per spec.
    fn decl_specs(&mut self) -> Result<(NodeRange, FileRange)> {
        let Some(keyword) = self.peek() else {
            return Err(self.emit_expected("a declaration"));
        };
        self.advance();

        let mut end = keyword.range;
        let mut previous = None;

        let specs = self.multi(|this| {
            if this.eat(Token::LParens) {
                let mut iota = 0;
                while !this.peek_is(Token::RParens) {
                    let spec = this.spec(keyword.token, iota, &mut previous)?;
                    this.push_indirect(spec);
                    iota += 1;
                    if !this.eat(Token::SemiColon) {
                        break;
                    }
                }
                end = this.expect(Token::RParens)?.range;
            } else {
                let spec = this.spec(keyword.token, 0, &mut previous)?;
                end = this.node_span(spec);
                this.push_indirect(spec);
            }
            Ok(())
        })?;

        Ok((specs, keyword.range.join(end)))
    }

    fn spec(
        &mut self,
        keyword: Token,
        iota: u32,
        previous: &mut Option<(Option<NodeId>, NodeRange)>,
    ) -> Result<NodeId> {
        if keyword == Token::Type {
            let identifier = self.identifier()?;
            let name = self.name_node(identifier);
            let alias = self.eat(Token::Assign);
            let typ = self.typ()?;
            let range = identifier.range.join(self.node_span(typ));
            return Ok(self.emit_node(Node::TypeSpec(TypeSpec { name, typ, alias }), range));
        }

        let names = self.multi(|this| {
            loop {
                let identifier = this.identifier()?;
                let name = this.name_node(identifier);
                this.push_indirect(name);
                if !this.eat(Token::Comma) {
                    break Ok(());
                }
            }
        })?;

        let mut typ = self.try_type()?;
        let mut values = NodeRange::default();
        let mut implicit = false;

        if self.eat(Token::Assign) {
            values = self.expression_list()?;
        } else if keyword == Token::Const {
            match previous {
                Some((previous_typ, previous_values)) if typ.is_none() => {
                    typ = *previous_typ;
                    values = *previous_values;
                    implicit = true;
                }
                _ => return Err(self.emit_expected("`=`")),
            }
        } else if typ.is_none() {
            return Err(self.emit_expected("a type or `=`"));
        }

        if keyword == Token::Const && !implicit {
            *previous = Some((typ, values));
        }

        let mut range = self.node_range_span(names).unwrap_or_default();
        if !implicit {
            if let Some(typ) = typ {
                range = range.join(self.node_span(typ));
            }
            if let Some(values) = self.node_range_span(values) {
                range = range.join(values);
            }
        }

        let spec = ValueSpec {
            names,
            typ,
            values,
            iota,
            implicit,
        };
        let node = match keyword {
            Token::Const => Node::ConstSpec(spec),
            _ => Node::VarSpec(spec),
        };
        Ok(self.emit_node(node, range))
    }

    /// Parses a function signature following the `func` keyword (and name, if any).
    fn signature(&mut self) -> Result<(Signature, FileRange)> {
        let mut variadic = false;
        let mut outputs = 0;
        let mut range = self.unexpected_range();

        let parameters = self.multi(|this| {
            let (is_variadic, inputs_range) = this.push_parameter_list()?;
            variadic = is_variadic;
            range = inputs_range;

            let output_base = this.indirect_stack.len();
            if this.peek_is(Token::LParens) {
                let (_, outputs_range) = this.push_parameter_list()?;
                range = range.join(outputs_range);
            } else if let Some(typ) = this.try_type()? {
                let span = this.node_span(typ);
                let parameter = Parameter { name: None, typ };
                let node = this.emit_node(Node::Parameter(parameter), span);
                this.push_indirect(node);
                range = range.join(span);
            }
            outputs = this.indirect_stack.len() - output_base;

            Ok(())
        })?;

        let signature = Signature {
            parameters,
            outputs: outputs as u16,
            variadic,
        };
        Ok((signature, range))
    }

    /// Parses a parenthesized list of parameters, pushing a `Parameter` node for each.
    ///
    /// Either all parameters are named, or none of them are. In the former case a run of names
    /// shares the type which follows the last name (`a, b int`), in the latter every entry is a
    /// type.
    fn push_parameter_list(&mut self) -> Result<(bool, FileRange)> {
        struct Entry {
            name: Option<Identifier>,
            typ: Option<NodeId>,
            variadic: bool,
        }

        let open = self.expect(Token::LParens)?;
        let mut entries = SmallVec::<[Entry; 8]>::new();

        while !self.peek_is(Token::RParens) {
            let entry = if self.peek_is(Token::Identifier) {
                let identifier = self.identifier()?;
                if self.peek_is(Token::Dot) {
                    let typ = self.qualified_type(identifier)?;
                    Entry {
                        name: None,
                        typ: Some(typ),
                        variadic: false,
                    }
                } else if self.peek_is(Token::Comma) || self.peek_is(Token::RParens) {
                    Entry {
                        name: Some(identifier),
                        typ: None,
                        variadic: false,
                    }
                } else {
                    let variadic = self.eat(Token::Ellipses);
                    let typ = self.typ()?;
                    Entry {
                        name: Some(identifier),
                        typ: Some(typ),
                        variadic,
                    }
                }
            } else {
                let variadic = self.eat(Token::Ellipses);
                let typ = self.typ()?;
                Entry {
                    name: None,
                    typ: Some(typ),
                    variadic,
                }
            };

            entries.push(entry);

            if !self.eat(Token::Comma) {
                break;
            }
        }

        let close = self.expect(Token::RParens)?;
        let range = open.range.join(close.range);

        let named = entries
            .iter()
            .any(|entry| entry.name.is_some() && entry.typ.is_some());
        let variadic = entries.last().map_or(false, |entry| entry.variadic);

        if named {
            let mut pending = 0;
            for i in 0..entries.len() {
                let Some(typ) = entries[i].typ else { continue };
                for entry in &entries[pending..=i] {
                    let Some(identifier) = entry.name else {
                        let span = entry.typ.map_or(range, |typ| self.node_span(typ));
                        let error = syntax_error!(span, "mixed named and unnamed parameters");
                        self.diagnostics.push(error);
                        return Err(());
                    };
                    let name = self.name_node(identifier);
                    let span = identifier.range.join(self.node_span(typ));
                    let parameter = Parameter {
                        name: Some(name),
                        typ,
                    };
                    let node = self.emit_node(Node::Parameter(parameter), span);
                    self.push_indirect(node);
                }
                pending = i + 1;
            }

            if pending != entries.len() {
                let error = syntax_error!(close.range, "missing parameter type");
                self.diagnostics.push(error);
                return Err(());
            }
        } else {
            for entry in &entries {
                let typ = match (entry.typ, entry.name) {
                    (Some(typ), _) => typ,
                    (None, Some(identifier)) => self.name_node(identifier),
                    (None, None) => unreachable!("parameter without name or type"),
                };
                let span = self.node_span(typ);
                let parameter = Parameter { name: None, typ };
                let node = self.emit_node(Node::Parameter(parameter), span);
                self.push_indirect(node);
            }
        }

        Ok((variadic, range))
    }

    fn typ(&mut self) -> Result<NodeId> {
        match self.try_type()? {
            Some(typ) => Ok(typ),
            None => Err(self.emit_expected("a type")),
        }
    }

    fn try_type(&mut self) -> Result<Option<NodeId>> {
        let Some(token) = self.peek() else { return Ok(None) };

        let typ = match token.token {
            Token::Identifier => {
                let identifier = self.identifier()?;
                if self.peek_is(Token::Dot) {
                    self.qualified_type(identifier)?
                } else {
                    self.name_node(identifier)
                }
            }
            Token::Times => {
                self.advance();
                let inner = self.typ()?;
                let range = token.range.join(self.node_span(inner));
                self.emit_node(Node::Pointer(inner), range)
            }
            Token::LBracket => {
                self.advance();
                if self.eat(Token::RBracket) {
                    let inner = self.typ()?;
                    let range = token.range.join(self.node_span(inner));
                    self.emit_node(Node::Slice(inner), range)
                } else {
                    let length = if self.eat(Token::Ellipses) {
                        None
                    } else {
                        let saved = std::mem::replace(&mut self.no_composite, false);
                        let length = self.expression()?;
                        self.no_composite = saved;
                        Some(length)
                    };
                    self.expect(Token::RBracket)?;
                    let inner = self.typ()?;
                    let range = token.range.join(self.node_span(inner));
                    self.emit_node(Node::Array(length, inner), range)
                }
            }
            Token::Map => {
                self.advance();
                self.expect(Token::LBracket)?;
                let key = self.typ()?;
                self.expect(Token::RBracket)?;
                let value = self.typ()?;
                let range = token.range.join(self.node_span(value));
                self.emit_node(Node::Map(key, value), range)
            }
            Token::Chan => {
                self.advance();
                let kind = if self.eat(Token::LThinArrow) {
                    ChannelKind::Send
                } else {
                    ChannelKind::SendRecv
                };
                let inner = self.typ()?;
                let range = token.range.join(self.node_span(inner));
                self.emit_node(Node::Channel(kind, inner), range)
            }
            Token::LThinArrow if self.peek2_is(Token::Chan) => {
                self.advance();
                self.advance();
                let inner = self.typ()?;
                let range = token.range.join(self.node_span(inner));
                self.emit_node(Node::Channel(ChannelKind::Recv, inner), range)
            }
            Token::Func => {
                self.advance();
                let (signature, range) = self.signature()?;
                self.emit_node(Node::FunctionType(signature), token.range.join(range))
            }
            Token::Struct => self.struct_type()?,
            Token::Interface => self.interface_type()?,
            Token::LParens => {
                self.advance();
                let inner = self.typ()?;
                let close = self.expect(Token::RParens)?;
                self.emit_node(Node::Paren(inner), token.range.join(close.range))
            }
            _ => return Ok(None),
        };

        Ok(Some(typ))
    }

    fn qualified_type(&mut self, package: Identifier) -> Result<NodeId> {
        let base = self.name_node(package);
        self.expect(Token::Dot)?;
        let member = self.identifier()?;
        let range = package.range.join(member.range);
        Ok(self.emit_node(Node::Selector(base, member), range))
    }

    fn struct_type(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::Struct)?;
        self.expect(Token::LCurly)?;

        let fields = self.multi(|this| {
            while !this.peek_is(Token::RCurly) {
                this.push_field_decl()?;
                if !this.eat(Token::SemiColon) {
                    break;
                }
            }
            Ok(())
        })?;

        let end = self.expect(Token::RCurly)?;
        Ok(self.emit_node(Node::Struct(fields), start.range.join(end.range)))
    }

    fn push_field_decl(&mut self) -> Result<()> {
        let embedded_type = if self.peek_is(Token::Times) {
            let star = self.expect(Token::Times)?;
            let identifier = self.identifier()?;
            let inner = if self.peek_is(Token::Dot) {
                self.qualified_type(identifier)?
            } else {
                self.name_node(identifier)
            };
            let range = star.range.join(self.node_span(inner));
            Some(self.emit_node(Node::Pointer(inner), range))
        } else if self.peek_is(Token::Identifier) {
            if self.peek2_is(Token::Dot) {
                let identifier = self.identifier()?;
                Some(self.qualified_type(identifier)?)
            } else if matches!(
                self.tokens.get(self.current_token + 1).map(|next| next.token),
                None | Some(Token::SemiColon | Token::RCurly | Token::String | Token::RawString)
            ) {
                let identifier = self.identifier()?;
                Some(self.name_node(identifier))
            } else {
                None
            }
        } else {
            return Err(self.emit_expected("a field"));
        };

        if let Some(typ) = embedded_type {
            let tag = self.try_tag();
            let mut range = self.node_span(typ);
            if let Some(tag) = tag {
                range = range.join(tag);
            }
            let field = Field {
                name: None,
                typ,
                embedded: true,
                tag,
            };
            let node = self.emit_node(Node::Field(field), range);
            self.push_indirect(node);
            return Ok(());
        }

        let mut names = SmallVec::<[Identifier; 4]>::new();
        loop {
            names.push(self.identifier()?);
            if !self.eat(Token::Comma) {
                break;
            }
        }

        let typ = self.typ()?;
        let tag = self.try_tag();

        for name in names {
            let mut range = name.range.join(self.node_span(typ));
            if let Some(tag) = tag {
                range = range.join(tag);
            }
            let field = Field {
                name: Some(name),
                typ,
                embedded: false,
                tag,
            };
            let node = self.emit_node(Node::Field(field), range);
            self.push_indirect(node);
        }

        Ok(())
    }

    fn try_tag(&mut self) -> Option<FileRange> {
        self.try_expect(Token::String)
            .or_else(|| self.try_expect(Token::RawString))
            .map(|token| token.range)
    }

    fn interface_type(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::Interface)?;
        self.expect(Token::LCurly)?;

        let elements = self.multi(|this| {
            while !this.peek_is(Token::RCurly) {
                let element = if this.peek_is(Token::Identifier) && this.peek2_is(Token::LParens) {
                    let name = this.identifier()?;
                    let (signature, range) = this.signature()?;
                    this.emit_node(Node::MethodElement(name, signature), name.range.join(range))
                } else {
                    let typ = this.typ()?;
                    let range = this.node_span(typ);
                    this.emit_node(Node::EmbeddedElement(typ), range)
                };
                this.push_indirect(element);

                if !this.eat(Token::SemiColon) {
                    break;
                }
            }
            Ok(())
        })?;

        let end = self.expect(Token::RCurly)?;
        Ok(self.emit_node(Node::Interface(elements), start.range.join(end.range)))
    }

    fn block(&mut self) -> Result<NodeId> {
        let open = self.expect(Token::LCurly)?;
        let saved = std::mem::replace(&mut self.no_composite, false);
        let statements = self.statement_list()?;
        self.no_composite = saved;
        let close = self.expect(Token::RCurly)?;
        Ok(self.emit_node(Node::Block(statements), open.range.join(close.range)))
    }

    fn statement_list(&mut self) -> Result<NodeRange> {
        self.multi(|this| {
            loop {
                if matches!(
                    this.peek_token(),
                    None | Some(Token::RCurly | Token::Case | Token::Default)
                ) {
                    break;
                }

                if this.eat(Token::SemiColon) {
                    continue;
                }

                let statement = this.statement()?;
                this.push_indirect(statement);

                if matches!(
                    this.peek_token(),
                    Some(Token::RCurly | Token::Case | Token::Default)
                ) {
                    break;
                }

                this.expect(Token::SemiColon)?;
            }
            Ok(())
        })
    }

    fn statement(&mut self) -> Result<NodeId> {
        let Some(token) = self.peek() else {
            return Err(self.emit_expected("a statement"));
        };

        match token.token {
            Token::LCurly => self.block(),
            Token::Return => self.return_stmt(),
            Token::If => self.if_stmt(),
            Token::For => self.for_stmt(),
            Token::Switch => self.switch_stmt(),
            Token::Select => self.select_stmt(),
            Token::Go | Token::Defer => {
                self.advance();
                let expr = self.expression()?;
                let range = token.range.join(self.node_span(expr));
                let node = match token.token {
                    Token::Go => Node::Go(expr),
                    _ => Node::Defer(expr),
                };
                Ok(self.emit_node(node, range))
            }
            Token::Break | Token::Continue | Token::Goto | Token::Fallthrough => {
                self.advance();
                let kind = match token.token {
                    Token::Break => BranchKind::Break,
                    Token::Continue => BranchKind::Continue,
                    Token::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let mut range = token.range;
                let mut label = None;
                if kind != BranchKind::Fallthrough && self.peek_is(Token::Identifier) {
                    let identifier = self.identifier()?;
                    range = range.join(identifier.range);
                    label = Some(identifier);
                }
                Ok(self.emit_node(Node::Branch(kind, label), range))
            }
            Token::Var | Token::Const | Token::Type => {
                let (specs, range) = self.decl_specs()?;
                Ok(self.emit_node(Node::DeclStmt(specs), range))
            }
            Token::Identifier if self.peek2_is(Token::Colon) => {
                let label = self.identifier()?;
                let colon = self.expect(Token::Colon)?;
                let inner = if self.peek_is(Token::RCurly) || self.peek_is(Token::SemiColon) {
                    self.emit_node(Node::Empty, FileRange::from(colon.range.end..colon.range.end))
                } else {
                    self.statement()?
                };
                let range = label.range.join(self.node_span(inner));
                Ok(self.emit_node(Node::Labeled(label, inner), range))
            }
            _ => match self.simple_statement(false)? {
                Simple::Statement(statement) => Ok(statement),
                Simple::Range(_) => unreachable!("range clause outside of `for`"),
            },
        }
    }

    fn return_stmt(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::Return)?;

        let values = if matches!(
            self.peek_token(),
            None | Some(Token::SemiColon | Token::RCurly | Token::Case | Token::Default)
        ) {
            NodeRange::default()
        } else {
            self.expression_list()?
        };

        let mut range = start.range;
        if let Some(values) = self.node_range_span(values) {
            range = range.join(values);
        }
        Ok(self.emit_node(Node::Return(values), range))
    }

    fn simple_statement(&mut self, allow_range: bool) -> Result<Simple> {
        let base = self.indirect_stack.len();
        let first = self.expression()?;

        if self.peek_is(Token::Comma) || self.peek_is(Token::Assign) || self.peek_is(Token::Define)
        {
            self.push_indirect(first);
            while self.eat(Token::Comma) {
                let expr = self.expression()?;
                self.push_indirect(expr);
            }

            let define = if self.eat(Token::Define) {
                true
            } else if self.eat(Token::Assign) {
                false
            } else {
                self.indirect_stack.truncate(base);
                return Err(self.emit_expected("`=` or `:=`"));
            };

            let lhs_count = self.indirect_stack.len() - base;

            if allow_range && self.peek_is(Token::Range) {
                self.advance();
                let expr = self.expression()?;
                let targets = &self.indirect_stack[base..];
                let clause = RangeClause {
                    key: targets.first().copied(),
                    value: targets.get(1).copied(),
                    define,
                    expr,
                };
                let extra = targets.get(2).copied();
                self.indirect_stack.truncate(base);

                if let Some(extra) = extra {
                    let error = syntax_error!(
                        self.node_span(extra),
                        "range clause permits at most two iteration variables"
                    );
                    self.diagnostics.push(error);
                    return Err(());
                }
                return Ok(Simple::Range(clause));
            }

            loop {
                let expr = self.expression()?;
                self.push_indirect(expr);
                if !self.eat(Token::Comma) {
                    break;
                }
            }

            let last = self.indirect_stack[self.indirect_stack.len() - 1];
            let range = self.node_span(first).join(self.node_span(last));
            let full = self.pop_indirect(base);
            let assign = AssignRange {
                full,
                lhs_count: lhs_count as u32,
            };
            let node = if define {
                Node::Define(assign)
            } else {
                Node::Assign(assign)
            };
            return Ok(Simple::Statement(self.emit_node(node, range)));
        }

        let Some(token) = self.peek() else {
            return Ok(Simple::Statement(first));
        };

        let assign_op = match token.token {
            Token::PlusAssign => Some(BinaryOperator::Add),
            Token::MinusAssign => Some(BinaryOperator::Sub),
            Token::TimesAssign => Some(BinaryOperator::Mul),
            Token::DivAssign => Some(BinaryOperator::Div),
            Token::RemAssign => Some(BinaryOperator::Rem),
            Token::AndAssign => Some(BinaryOperator::BitAnd),
            Token::OrAssign => Some(BinaryOperator::BitOr),
            Token::XorAssign => Some(BinaryOperator::BitXor),
            Token::ShlAssign => Some(BinaryOperator::ShiftLeft),
            Token::ShrAssign => Some(BinaryOperator::ShiftRight),
            Token::NandAssign => Some(BinaryOperator::BitNand),
            _ => None,
        };

        let start = self.node_span(first);

        let statement = if let Some(op) = assign_op {
            self.advance();
            let value = self.expression()?;
            let range = start.join(self.node_span(value));
            self.emit_node(Node::AssignOp(first, op, value), range)
        } else {
            match token.token {
                Token::PlusPlus => {
                    self.advance();
                    self.emit_node(Node::Increment(first), start.join(token.range))
                }
                Token::MinusMinus => {
                    self.advance();
                    self.emit_node(Node::Decrement(first), start.join(token.range))
                }
                Token::LThinArrow => {
                    self.advance();
                    let value = self.expression()?;
                    let range = start.join(self.node_span(value));
                    self.emit_node(Node::Send(first, value), range)
                }
                _ => first,
            }
        };

        Ok(Simple::Statement(statement))
    }

    fn if_stmt(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::If)?;

        let saved = std::mem::replace(&mut self.no_composite, true);
        let first = self.simple_statement(false)?.statement();
        let (init, cond) = if self.eat(Token::SemiColon) {
            (Some(first), self.expression()?)
        } else {
            (None, first)
        };
        self.no_composite = saved;

        let then = self.block()?;

        let els = if self.eat(Token::Else) {
            if self.peek_is(Token::If) {
                Some(self.if_stmt()?)
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };

        let end = self.node_span(els.unwrap_or(then));
        let stmt = IfStmt {
            init,
            cond,
            then,
            els,
        };
        Ok(self.emit_node(Node::If(stmt), start.range.join(end)))
    }

    fn for_stmt(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::For)?;
        let saved = std::mem::replace(&mut self.no_composite, true);

        let mut init = None;
        let mut cond = None;
        let mut post = None;
        let mut range_clause = None;

        if self.peek_is(Token::LCurly) {
            // infinite loop
        } else if self.peek_is(Token::Range) {
            self.expect(Token::Range)?;
            let expr = self.expression()?;
            range_clause = Some(RangeClause {
                key: None,
                value: None,
                define: false,
                expr,
            });
        } else {
            let first = if self.peek_is(Token::SemiColon) {
                None
            } else {
                Some(self.simple_statement(true)?)
            };

            match first {
                Some(Simple::Range(clause)) => range_clause = Some(clause),
                first => {
                    let first = first.map(Simple::statement);
                    if self.eat(Token::SemiColon) {
                        init = first;
                        if !self.peek_is(Token::SemiColon) {
                            cond = Some(self.expression()?);
                        }
                        self.expect(Token::SemiColon)?;
                        if !self.peek_is(Token::LCurly) {
                            post = Some(self.simple_statement(false)?.statement());
                        }
                    } else {
                        cond = first;
                    }
                }
            }
        }

        self.no_composite = saved;
        let body = self.block()?;
        let range = start.range.join(self.node_span(body));

        let node = match range_clause {
            Some(clause) => Node::ForRange(RangeStmt {
                key: clause.key,
                value: clause.value,
                define: clause.define,
                expr: clause.expr,
                body,
            }),
            None => Node::For(ForStmt {
                init,
                cond,
                post,
                body,
            }),
        };
        Ok(self.emit_node(node, range))
    }

    fn switch_stmt(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::Switch)?;
        let saved = std::mem::replace(&mut self.no_composite, true);

        let mut init = None;
        let mut tag = None;
        if !self.peek_is(Token::LCurly) {
            let first = if self.peek_is(Token::SemiColon) {
                None
            } else {
                Some(self.simple_statement(false)?.statement())
            };
            if self.eat(Token::SemiColon) {
                init = first;
                if !self.peek_is(Token::LCurly) {
                    tag = Some(self.simple_statement(false)?.statement());
                }
            } else {
                tag = first;
            }
        }

        self.no_composite = saved;

        let guard = tag.and_then(|tag| self.type_switch_guard(tag));

        self.expect(Token::LCurly)?;
        let clauses = self.multi(|this| {
            while !this.peek_is(Token::RCurly) {
                let clause = this.case_clause(guard.is_some())?;
                this.push_indirect(clause);
            }
            Ok(())
        })?;
        let close = self.expect(Token::RCurly)?;
        let range = start.range.join(close.range);

        let node = match guard {
            Some((binding, subject)) => Node::TypeSwitch(TypeSwitchStmt {
                init,
                binding,
                subject,
                clauses,
            }),
            None => Node::Switch(SwitchStmt {
                init,
                tag,
                clauses,
            }),
        };
        Ok(self.emit_node(node, range))
    }

    /// Recognizes `x.(type)` and `v := x.(type)`, returning the binding and the subject.
    fn type_switch_guard(&self, tag: NodeId) -> Option<(Option<NodeId>, NodeId)> {
        match self.nodes.kind(tag) {
            Node::TypeAssertion(subject, None) => Some((None, subject)),
            Node::Define(assign) => {
                let lhs = self.nodes.indirect(assign.lhs());
                let rhs = self.nodes.indirect(assign.rhs());
                match (lhs, rhs) {
                    ([binding], [value]) => match self.nodes.kind(*value) {
                        Node::TypeAssertion(subject, None) => Some((Some(*binding), subject)),
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn case_clause(&mut self, type_switch: bool) -> Result<NodeId> {
        let start = self.unexpected_range();

        let (exprs, default) = if self.eat(Token::Default) {
            (NodeRange::default(), true)
        } else {
            self.expect(Token::Case)?;
            let exprs = if type_switch {
                self.multi(|this| loop {
                    let typ = this.typ()?;
                    this.push_indirect(typ);
                    if !this.eat(Token::Comma) {
                        break Ok(());
                    }
                })?
            } else {
                self.expression_list()?
            };
            (exprs, false)
        };

        let colon = self.expect(Token::Colon)?;
        let body = self.statement_list()?;

        let end = self.node_range_span(body).unwrap_or(colon.range);
        let clause = CaseClause {
            exprs,
            body,
            default,
        };
        Ok(self.emit_node(Node::CaseClause(clause), start.join(end)))
    }

    fn select_stmt(&mut self) -> Result<NodeId> {
        let start = self.expect(Token::Select)?;
        self.expect(Token::LCurly)?;

        let clauses = self.multi(|this| {
            while !this.peek_is(Token::RCurly) {
                let clause_start = this.unexpected_range();
                let comm = if this.eat(Token::Default) {
                    None
                } else {
                    this.expect(Token::Case)?;
                    Some(this.simple_statement(false)?.statement())
                };
                let colon = this.expect(Token::Colon)?;
                let body = this.statement_list()?;
                let end = this.node_range_span(body).unwrap_or(colon.range);
                let clause = this.emit_node(Node::CommClause(comm, body), clause_start.join(end));
                this.push_indirect(clause);
            }
            Ok(())
        })?;

        let close = self.expect(Token::RCurly)?;
        Ok(self.emit_node(Node::Select(clauses), start.range.join(close.range)))
    }

    fn expression_list(&mut self) -> Result<NodeRange> {
        self.multi(|this| loop {
            let expr = this.expression()?;
            this.push_indirect(expr);
            if !this.eat(Token::Comma) {
                break Ok(());
            }
        })
    }

    fn expression(&mut self) -> Result<NodeId> {
        let lhs = self.unary_expr()?;
        self.binary_expr(lhs, 0)
    }

    fn binary_expr(&mut self, mut lhs: NodeId, min_precedence: u8) -> Result<NodeId> {
        while let Some(op) = self.peek_binary_op() {
            let current_precedence = op.precedence();
            if current_precedence <= min_precedence {
                break;
            }
            self.advance();

            let mut rhs = self.unary_expr()?;
            rhs = self.binary_expr(rhs, current_precedence)?;

            let range = self.node_span(lhs).join(self.node_span(rhs));
            lhs = self.emit_node(Node::Binary(lhs, op, rhs), range);
        }
        Ok(lhs)
    }

    fn peek_binary_op(&self) -> Option<BinaryOperator> {
        let op = match self.peek_token()? {
            Token::LogicalOr => BinaryOperator::LogicalOr,
            Token::LogicalAnd => BinaryOperator::LogicalAnd,
            Token::Equal => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::Less => BinaryOperator::Less,
            Token::LessEqual => BinaryOperator::LessEqual,
            Token::Greater => BinaryOperator::Greater,
            Token::GreaterEqual => BinaryOperator::GreaterEqual,
            Token::Plus => BinaryOperator::Add,
            Token::Minus => BinaryOperator::Sub,
            Token::Or => BinaryOperator::BitOr,
            Token::Xor => BinaryOperator::BitXor,
            Token::Times => BinaryOperator::Mul,
            Token::Div => BinaryOperator::Div,
            Token::Rem => BinaryOperator::Rem,
            Token::Shl => BinaryOperator::ShiftLeft,
            Token::Shr => BinaryOperator::ShiftRight,
            Token::And => BinaryOperator::BitAnd,
            Token::Nand => BinaryOperator::BitNand,
            _ => return None,
        };
        Some(op)
    }

    fn unary_expr(&mut self) -> Result<NodeId> {
        let mut prefixes = SmallVec::<[(UnaryOperator, FileRange); 4]>::new();
        while let Some(token) = self.peek() {
            let op = match token.token {
                Token::Plus => UnaryOperator::Plus,
                Token::Minus => UnaryOperator::Minus,
                Token::LogicalNot => UnaryOperator::Not,
                Token::Xor => UnaryOperator::Xor,
                Token::Times => UnaryOperator::Deref,
                Token::And => UnaryOperator::Ref,
                // `<-chan T` is a type, not a receive
                Token::LThinArrow if !self.peek2_is(Token::Chan) => UnaryOperator::Recv,
                _ => break,
            };
            self.advance();
            prefixes.push((op, token.range));
        }

        let mut inner = self.primary_expr()?;

        while let Some((op, range)) = prefixes.pop() {
            let range = range.join(self.node_span(inner));
            inner = self.emit_node(Node::Unary(op, inner), range);
        }

        Ok(inner)
    }

    fn primary_expr(&mut self) -> Result<NodeId> {
        let mut base = self.operand()?;

        loop {
            let Some(token) = self.peek() else { return Ok(base) };
            let start = self.node_span(base);

            base = match token.token {
                Token::Dot => {
                    self.advance();
                    if self.eat(Token::LParens) {
                        let typ = if self.eat(Token::Type) {
                            None
                        } else {
                            Some(self.typ()?)
                        };
                        let close = self.expect(Token::RParens)?;
                        self.emit_node(Node::TypeAssertion(base, typ), start.join(close.range))
                    } else {
                        let member = self.identifier()?;
                        self.emit_node(Node::Selector(base, member), start.join(member.range))
                    }
                }
                Token::LParens => self.call(base)?,
                Token::LBracket => self.index(base)?,
                Token::LCurly if self.allows_composite(base) => self.composite(Some(base))?,
                _ => return Ok(base),
            };
        }
    }

    fn allows_composite(&self, typ: NodeId) -> bool {
        match self.nodes.kind(typ) {
            Node::Array(..) | Node::Slice(_) | Node::Map(..) | Node::Struct(_) => true,
            Node::Name(_) => !self.no_composite,
            Node::Selector(base, _) => {
                !self.no_composite && matches!(self.nodes.kind(base), Node::Name(_))
            }
            _ => false,
        }
    }

    fn operand(&mut self) -> Result<NodeId> {
        let Some(token) = self.peek() else {
            return Err(self.emit_expected("an expression"));
        };

        let literal = match token.token {
            Token::Identifier => {
                let identifier = self.identifier()?;
                return Ok(self.name_node(identifier));
            }
            Token::Integer => {
                let value = parse_integer(&self.source[token.range.slice_range()]);
                Node::Integer(value)
            }
            Token::Float => Node::Float,
            Token::Imaginary => Node::Imaginary,
            Token::Rune => Node::Rune,
            Token::String | Token::RawString => Node::String,
            Token::LParens => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_composite, false);
                let inner = self.expression()?;
                self.no_composite = saved;
                let close = self.expect(Token::RParens)?;
                return Ok(self.emit_node(Node::Paren(inner), token.range.join(close.range)));
            }
            Token::Func => {
                self.advance();
                let (signature, range) = self.signature()?;
                if self.peek_is(Token::LCurly) {
                    let body = self.block()?;
                    let range = token.range.join(self.node_span(body));
                    return Ok(self.emit_node(Node::FunctionLiteral(signature, body), range));
                }
                return Ok(self.emit_node(Node::FunctionType(signature), token.range.join(range)));
            }
            _ => match self.try_type()? {
                Some(typ) => return Ok(typ),
                None => return Err(self.emit_expected("an expression")),
            },
        };

        self.advance();
        Ok(self.emit_node(literal, token.range))
    }

    fn call(&mut self, callee: NodeId) -> Result<NodeId> {
        self.expect(Token::LParens)?;
        let saved = std::mem::replace(&mut self.no_composite, false);

        let mut spread = false;
        let args = self.multi(|this| {
            while !this.peek_is(Token::RParens) {
                let arg = this.expression()?;
                this.push_indirect(arg);
                if this.eat(Token::Ellipses) {
                    spread = true;
                }
                if !this.eat(Token::Comma) {
                    break;
                }
            }
            Ok(())
        })?;

        self.no_composite = saved;
        let close = self.expect(Token::RParens)?;
        let range = self.node_span(callee).join(close.range);
        Ok(self.emit_node(Node::Call(callee, args, spread), range))
    }

    fn index(&mut self, base: NodeId) -> Result<NodeId> {
        self.expect(Token::LBracket)?;
        let saved = std::mem::replace(&mut self.no_composite, false);

        let low = if self.peek_is(Token::Colon) {
            None
        } else {
            Some(self.expression()?)
        };

        let node = if self.eat(Token::Colon) {
            let high = if self.peek_is(Token::RBracket) || self.peek_is(Token::Colon) {
                None
            } else {
                Some(self.expression()?)
            };
            let max = if self.eat(Token::Colon) {
                Some(self.expression()?)
            } else {
                None
            };
            Node::SliceExpr(base, SliceBounds { low, high, max })
        } else {
            match low {
                Some(index) => Node::Index(base, index),
                None => return Err(self.emit_expected("an index")),
            }
        };

        self.no_composite = saved;
        let close = self.expect(Token::RBracket)?;
        let range = self.node_span(base).join(close.range);
        Ok(self.emit_node(node, range))
    }

    fn composite(&mut self, typ: Option<NodeId>) -> Result<NodeId> {
        let open = self.expect(Token::LCurly)?;
        let saved = std::mem::replace(&mut self.no_composite, false);

        let elements = self.multi(|this| {
            while !this.peek_is(Token::RCurly) {
                let element = this.element()?;
                if this.eat(Token::Colon) {
                    let value = this.element()?;
                    let range = this.node_span(element).join(this.node_span(value));
                    let keyed = this.emit_node(Node::KeyedElement(element, value), range);
                    this.push_indirect(keyed);
                } else {
                    this.push_indirect(element);
                }
                if !this.eat(Token::Comma) {
                    break;
                }
            }
            Ok(())
        })?;

        self.no_composite = saved;
        let close = self.expect(Token::RCurly)?;
        let start = typ.map_or(open.range, |typ| self.node_span(typ));
        Ok(self.emit_node(Node::Composite(typ, elements), start.join(close.range)))
    }

    fn element(&mut self) -> Result<NodeId> {
        if self.peek_is(Token::LCurly) {
            self.composite(None)
        } else {
            self.expression()
        }
    }
}

enum Simple {
    Statement(NodeId),
    Range(RangeClause),
}

impl Simple {
    fn statement(self) -> NodeId {
        match self {
            Simple::Statement(statement) => statement,
            Simple::Range(_) => unreachable!("range clauses are only parsed in `for` headers"),
        }
    }
}

struct RangeClause {
    key: Option<NodeId>,
    value: Option<NodeId>,
    define: bool,
    expr: NodeId,
}

/// Parses the value of an integer literal, saturating on overflow.
fn parse_integer(text: &str) -> u64 {
    let digits: String = text.chars().filter(|&ch| ch != '_').collect();

    let (radix, digits) = if let Some(rest) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, rest)
    } else if let Some(rest) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (2, rest)
    } else if let Some(rest) = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
    {
        (8, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };

    u64::from_str_radix(digits, radix).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> File {
        match parse(source) {
            Ok(file) => file,
            Err(error) => panic!("failed to parse: {}", error.message),
        }
    }

    fn func_body(file: &File, index: usize) -> Vec<NodeId> {
        let Node::Function(func) = file.nodes.kind(file.declarations[index]) else {
            panic!("not a function")
        };
        let Node::Block(statements) = file.nodes.kind(func.body.unwrap()) else {
            panic!("not a block")
        };
        file.nodes.indirect(statements).to_vec()
    }

    #[test]
    fn package_and_imports() {
        let file = parse_ok("package main\n\nimport (\n\t\"fmt\"\n\tio \"io/ioutil\"\n\t_ \"os\"\n)\n");
        assert_eq!(file.name(file.package.text), "main");
        let names: Vec<_> = file
            .imports
            .iter()
            .map(|import| import.name.map(|name| file.name(name).to_owned()))
            .collect();
        assert_eq!(
            names,
            vec![Some("fmt".to_owned()), Some("io".to_owned()), None]
        );
        assert_eq!(&*file.imports[1].path, "io/ioutil");
    }

    #[test]
    fn grouped_parameters() {
        let file = parse_ok("package p\nfunc f(a, b int, c ...string) (int, error)\n");
        let Node::Function(func) = file.nodes.kind(file.declarations[0]) else {
            panic!("not a function")
        };
        assert!(func.body.is_none());
        assert!(func.signature.variadic);
        assert_eq!(func.signature.inputs().len(), 3);
        assert_eq!(func.signature.outputs().len(), 2);

        let inputs = file.nodes.indirect(func.signature.inputs());
        let a = file.nodes.parameter(inputs[0]);
        let b = file.nodes.parameter(inputs[1]);
        assert_eq!(a.typ, b.typ);
        assert_eq!(file.text(a.name.unwrap()), "a");
        assert_eq!(file.text(b.typ), "int");
    }

    #[test]
    fn unnamed_parameters_are_types() {
        let file = parse_ok("package p\nfunc f(int, string) {}\n");
        let Node::Function(func) = file.nodes.kind(file.declarations[0]) else {
            panic!("not a function")
        };
        let inputs = file.nodes.indirect(func.signature.inputs());
        let texts: Vec<_> = inputs
            .iter()
            .map(|&param| {
                let param = file.nodes.parameter(param);
                assert_eq!(param.name, None);
                file.text(param.typ)
            })
            .collect();
        assert_eq!(texts, ["int", "string"]);
    }

    #[test]
    fn method_receiver() {
        let file = parse_ok("package p\ntype T struct{}\nfunc (t *T) M() {}\n");
        let Node::Function(func) = file.nodes.kind(file.declarations[1]) else {
            panic!("not a function")
        };
        let receiver = file.nodes.parameter(func.receiver.unwrap());
        assert_eq!(file.text(receiver.typ), "*T");
        assert_eq!(file.text(func.name), "M");
    }

    #[test]
    fn implicit_constants() {
        let file = parse_ok("package p\nconst (\n\ta int = iota\n\tb\n\tc\n)\n");
        assert_eq!(file.declarations.len(), 3);
        let Node::ConstSpec(c) = file.nodes.kind(file.declarations[2]) else {
            panic!("not a constant")
        };
        assert!(c.implicit);
        assert_eq!(c.iota, 2);
        assert_eq!(file.text(c.typ.unwrap()), "int");
        assert_eq!(c.values.len(), 1);
    }

    #[test]
    fn children_in_source_order() {
        let file = parse_ok("package p\nfunc f() {\n\tg(a, b+1)(c)\n\tx, y = 1, z\n}\n");
        let body = func_body(&file, 0);

        let children = |node| {
            let mut children = Vec::new();
            file.nodes.for_each_child(node, |child| children.push(file.text(child).to_owned()));
            children
        };

        assert_eq!(children(body[0]), ["g(a, b+1)", "c"]);
        let Node::Call(inner, _, _) = file.nodes.kind(body[0]) else {
            panic!("expected a call")
        };
        assert_eq!(children(inner), ["g", "a", "b+1"]);
        assert_eq!(children(body[1]), ["x", "y", "1", "z"]);
    }

    #[test]
    fn binary_precedence() {
        let file = parse_ok("package p\nvar x = 1 + 2*3 == 7\n");
        let Node::VarSpec(spec) = file.nodes.kind(file.declarations[0]) else {
            panic!("not a variable")
        };
        let value = file.nodes.indirect(spec.values)[0];
        let Node::Binary(lhs, BinaryOperator::Equal, _) = file.nodes.kind(value) else {
            panic!("expected comparison at the root")
        };
        assert_eq!(file.text(lhs), "1 + 2*3");
    }

    #[test]
    fn composite_literal_in_if_header() {
        let source = "package p\nfunc f() {\n\tif x == y {\n\t}\n\tv := T{a: 1, b: []int{2}}\n}\n";
        let file = parse_ok(source);
        let body = func_body(&file, 0);
        assert!(matches!(file.nodes.kind(body[0]), Node::If(_)));

        let Node::Define(assign) = file.nodes.kind(body[1]) else {
            panic!("expected a definition")
        };
        let value = file.nodes.indirect(assign.rhs())[0];
        let Node::Composite(Some(_), elements) = file.nodes.kind(value) else {
            panic!("expected a composite literal")
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn statements() {
        let source = "package p
func f() {
	a, b := g()
	a += 1
	b++
	ch <- a
	for i := 0; i < 10; i++ {
	}
	for k, v := range m {
	}
	switch v := x.(type) {
	case int, *T:
	default:
	}
	select {
	case v := <-ch:
	default:
	}
	return
}
";
        let file = parse_ok(source);
        let body = func_body(&file, 0);
        let kinds: Vec<_> = body
            .iter()
            .map(|&node| match file.nodes.kind(node) {
                Node::Define(_) => "define",
                Node::AssignOp(..) => "assign-op",
                Node::Increment(_) => "increment",
                Node::Send(..) => "send",
                Node::For(_) => "for",
                Node::ForRange(_) => "range",
                Node::TypeSwitch(_) => "type-switch",
                Node::Select(_) => "select",
                Node::Return(_) => "return",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            [
                "define",
                "assign-op",
                "increment",
                "send",
                "for",
                "range",
                "type-switch",
                "select",
                "return"
            ]
        );

        let Node::TypeSwitch(switch) = file.nodes.kind(body[6]) else {
            unreachable!()
        };
        assert_eq!(file.text(switch.binding.unwrap()), "v");
        assert_eq!(file.text(switch.subject), "x");
    }

    #[test]
    fn struct_and_interface_types() {
        let source = "package p
type S struct {
	a, b int
	*T
	io.Reader
	c string `json:\"c\"`
}
type I interface {
	M(x int) error
	J
}
";
        let file = parse_ok(source);
        let Node::TypeSpec(spec) = file.nodes.kind(file.declarations[0]) else {
            panic!("not a type")
        };
        let Node::Struct(fields) = file.nodes.kind(spec.typ) else {
            panic!("not a struct")
        };
        let embedded: Vec<_> = file
            .nodes
            .indirect(fields)
            .iter()
            .map(|&field| match file.nodes.kind(field) {
                Node::Field(field) => field.embedded,
                _ => panic!("not a field"),
            })
            .collect();
        assert_eq!(embedded, [false, false, true, true, false]);

        let Node::TypeSpec(spec) = file.nodes.kind(file.declarations[1]) else {
            panic!("not a type")
        };
        let Node::Interface(elements) = file.nodes.kind(spec.typ) else {
            panic!("not an interface")
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn integer_literals() {
        assert_eq!(parse_integer("42"), 42);
        assert_eq!(parse_integer("0x_FF"), 255);
        assert_eq!(parse_integer("0b101"), 5);
        assert_eq!(parse_integer("017"), 15);
        assert_eq!(parse_integer("0o17"), 15);
        assert_eq!(parse_integer("1_000"), 1000);
        assert_eq!(parse_integer("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn reports_first_error() {
        let error = parse("package p\nfunc f( {\n}\n").unwrap_err();
        assert_eq!(error.kind, crate::diagnostic::ProblemKind::Syntax);
        assert_eq!(error.message, "expected a type, found `{`");
    }
}
