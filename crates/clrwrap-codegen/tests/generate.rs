use std::path::PathBuf;

use clrwrap_codegen::{execute, execute_source, GenerateOptions, GenerationOutput};
use clrwrap_core::{DiagnosticKind, FileKind};

const WIDGET_HEADER: &str = "\
#pragma once
#include <optional>

namespace N {
enum class Mode : int { a, b };

class Widget {
    void *impl;
public:
    Mode getMode() const;
};
}
";

fn options() -> GenerateOptions {
    let mut options = GenerateOptions::new("N", "M");
    options.wrapped_object_name = "native".into();
    options
}

fn generate(source: &str, options: &GenerateOptions) -> GenerationOutput {
    execute_source(source, "Api.hpp", options).unwrap()
}

fn header(out: &GenerationOutput) -> String {
    out.file(FileKind::Declaration).unwrap().text().into_owned()
}

fn definition(out: &GenerationOutput) -> String {
    out.file(FileKind::Definition).unwrap().text().into_owned()
}

/// Lines between `opening` and the next `};`.
fn block<'a>(text: &'a str, opening: &str) -> Vec<&'a str> {
    text.lines()
        .skip_while(|l| !l.contains(opening))
        .skip(1)
        .take_while(|l| l.trim() != "};")
        .collect()
}

#[test]
fn end_to_end_widget() {
    let out = generate(WIDGET_HEADER, &options());
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

    let h = header(&out);
    assert!(h.starts_with("// This is an auto-generated file. Do not modify.\n"));
    assert!(h.contains("#include \"Api.hpp\""));
    assert!(h.contains("namespace M {"));
    assert!(h.contains("public enum class Mode : int {"));
    assert!(h.contains("public ref class Widget {"));
    assert!(h.contains("N::Widget* native;"));
    assert!(h.contains("Widget(N::Widget* objectToTakeOwnershipOf);"));
    assert!(h.contains("M::Mode getMode();"));

    let cpp = definition(&out);
    assert!(cpp.contains("#include \"M.h\""));
    assert!(cpp.contains("// Implementation of M::Widget"));
    assert!(cpp.contains("M::Mode M::Widget::getMode() {"));
    assert!(cpp.contains("N::Mode unmanagedResult = native->getMode();"));
    assert!(cpp.contains("return static_cast<M::Mode>(unmanagedResult);"));
    assert!(cpp.contains("delete native;"));

    assert_eq!(out.report.types.enums, 1);
    assert_eq!(out.report.types.classes, 1);
}

#[test]
fn exactly_two_files_named_after_the_output_namespace() {
    let out = generate(WIDGET_HEADER, &options());
    let names: Vec<_> = out.files.iter().map(|f| (f.kind, f.name.as_str())).collect();
    assert_eq!(
        names,
        vec![(FileKind::Declaration, "M.h"), (FileKind::Definition, "M.cpp")]
    );
}

#[test]
fn enum_cases_keep_count_order_and_values() {
    let out = generate(
        "namespace N { enum Status : uint8_t { idle = 2, busy, failed = 7 }; }",
        &options(),
    );
    let h = header(&out);
    let cases: Vec<&str> = block(&h, "public enum class Status : uint8_t {")
        .into_iter()
        .map(str::trim)
        .collect();
    assert_eq!(cases, vec!["idle = 2,", "busy = 3,", "failed = 7"]);
}

#[test]
fn optional_returns_distinguish_absence_from_zero() {
    let out = generate(
        "namespace N {\n\
         class Counter { void *h; public:\n\
           std::optional<int> count() const;\n\
           std::optional<std::string> label() const;\n\
           void reset(std::optional<int> to);\n\
         };\n\
         }",
        &options(),
    );
    let cpp = definition(&out);
    assert!(cpp.contains("System::Nullable<int> M::Counter::count() {"));
    assert!(cpp.contains(
        "return (unmanagedResult.has_value() ? System::Nullable<int>(unmanagedResult.value()) : System::Nullable<int>());"
    ));
    assert!(cpp.contains(
        "return (unmanagedResult.has_value() ? marshal_as<System::String^>(unmanagedResult.value()) : nullptr);"
    ));
    assert!(cpp.contains(
        "std::optional<int> arg0 = (!to.HasValue ? std::nullopt : std::optional<int>(to.Value));"
    ));
}

#[test]
fn generation_is_deterministic() {
    let source = "namespace N {\n\
        struct Point { int x; int y; };\n\
        class Listener { public: virtual void moved(Point p) = 0; };\n\
        class Canvas : public Listener { void *h; public: Canvas(); void moved(Point p) override; std::vector<Point> points(); };\n\
        }";
    let first = generate(source, &options());
    let second = generate(source, &options());
    for (a, b) in first.files.iter().zip(&second.files) {
        assert_eq!(a.contents, b.contents);
        assert_eq!(a.digest(), b.digest());
    }
}

#[test]
fn single_method_protocol_becomes_single_method_interface() {
    let out = generate(
        "namespace N { class Listener { public: virtual ~Listener() = default; virtual void onEvent(int code) = 0; }; }",
        &options(),
    );
    let h = header(&out);
    let members = block(&h, "public interface class Listener {");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].trim(), "void onEvent(int code);");
    assert!(h.contains("public ref class ListenerAdapter : public M::Listener {"));
}

#[test]
fn struct_shape_with_handle_becomes_a_class() {
    let out = generate("namespace N { struct Sample { int x; void *impl; }; }", &options());
    let h = header(&out);
    assert!(h.contains("public ref class Sample {"));
    assert!(!h.contains("value struct Sample"));
}

#[test]
fn unresolved_member_is_dropped_and_siblings_survive() {
    let out = generate(
        "namespace N { class Widget { void *h; public: Gadget frob(); int size(); }; }",
        &options(),
    );
    let unresolved: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::UnresolvedType)
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].subject, "Widget::frob");

    let cpp = definition(&out);
    assert!(cpp.contains("int M::Widget::size() {"));
    assert!(!cpp.contains("frob"));
    assert_eq!(out.report.unresolved, 1);
}

#[test]
fn value_structs_marshal_through_helpers() {
    let out = generate(
        "namespace N {\n\
         struct Size { int w; int h; };\n\
         struct Frame { Size size; double scale; };\n\
         class View { void *h; public: Frame frame() const; void resize(const Size &size); };\n\
         }",
        &options(),
    );
    let h = header(&out);
    let size_at = h.find("public value struct Size {").unwrap();
    let frame_at = h.find("public value struct Frame {").unwrap();
    assert!(size_at < frame_at);
    assert!(h.contains("M::Size size;"));

    let cpp = definition(&out);
    assert!(cpp.contains("static M::Frame marshalFrameToManaged(const N::Frame& nativeValue);"));
    assert!(cpp.contains("managedValue.size = marshalSizeToManaged(nativeValue.size);"));
    assert!(cpp.contains("return marshalFrameToManaged(unmanagedResult);"));
    assert!(cpp.contains("const N::Size& arg0 = marshalSizeToNative(size);"));
}

#[test]
fn protocols_passed_to_native_code_use_bridges() {
    let out = generate(
        "namespace N {\n\
         class Listener { public: virtual void onEvent(int code) = 0; };\n\
         class Source { void *h; public: void setListener(std::shared_ptr<Listener> listener); std::shared_ptr<Listener> listener() const; };\n\
         }",
        &options(),
    );
    let cpp = definition(&out);
    assert!(cpp.contains("#include <vcclr.h>"));
    assert!(cpp.contains("class ListenerBridge : public N::Listener {"));
    assert!(cpp.contains("gcroot<M::Listener^> managedObject;"));
    assert!(cpp.contains(
        "std::shared_ptr<N::Listener> arg0 = (listener == nullptr ? nullptr : std::make_shared<ListenerBridge>(listener));"
    ));
    assert!(cpp.contains(
        "return (unmanagedResult == nullptr ? nullptr : gcnew M::ListenerAdapter(new std::shared_ptr<N::Listener>(unmanagedResult)));"
    ));
    assert!(cpp.contains("(*native)->onEvent(arg0);"));
}

#[test]
fn inherited_requirements_are_forwarded() {
    let out = generate(
        "namespace N {\n\
         class Named { public: virtual std::string name() const = 0; };\n\
         class Camera : public Named { void *h; public: int id() const; };\n\
         }",
        &options(),
    );
    let h = header(&out);
    assert!(h.contains("public ref class Camera : public M::Named {"));
    assert!(h.contains("virtual System::String^ name();"));
    let cpp = definition(&out);
    assert!(cpp.contains("std::string unmanagedResult = native->name();"));
}

#[test]
fn equality_operator_compares_native_objects() {
    let out = generate(
        "namespace N { class Token { void *h; public: bool operator==(const Token &other) const; }; }",
        &options(),
    );
    let h = header(&out);
    assert!(h.contains("static bool operator==(M::Token^ lhs, M::Token^ rhs);"));
    let cpp = definition(&out);
    assert!(cpp.contains("return (*lhs->native == *rhs->native);"));
}

#[test]
fn windows_platform_root_switches_conventions() {
    let mut options = options();
    options.platform_root = Some(PathBuf::from(
        "C:/Library/Developer/Platforms/Windows.platform/Developer/SDKs/Windows.sdk",
    ));
    let out = generate(WIDGET_HEADER, &options);
    let h = header(&out);
    assert!(h.contains("#define WIN32_LEAN_AND_MEAN\r\n#include <windows.h>\r\n"));
    assert!(h.contains("#include <Api.hpp>\r\n"));
    assert!(!h.replace("\r\n", "").contains('\n'));
    assert_eq!(out.report.platform, "windows");
}

#[test]
fn verbose_mode_traces_members_to_their_origin() {
    let mut options = options();
    options.verbose = true;
    let out = generate(WIDGET_HEADER, &options);
    assert!(header(&out).contains("M::Mode getMode(); // from N::Widget::getMode (line 10)"));
    assert!(definition(&out).contains("// from N::Widget::getMode (line 10)\nM::Mode M::Widget::getMode() {"));
}

#[test]
fn unsupported_constructs_do_not_abort() {
    let out = generate(
        "namespace N {\n\
         union Raw { int i; float f; };\n\
         template <typename T> class Box { T *value; };\n\
         enum class Mode { a };\n\
         }",
        &options(),
    );
    let subjects: Vec<_> = out.diagnostics.iter().map(|d| d.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Raw", "Box"]);
    assert!(header(&out).contains("public enum class Mode : int {"));
}

#[test]
fn unsigned_enum_values_use_the_full_width() {
    let out = generate(
        "namespace N { enum class Big : uint64_t { small = 1, max = 0xFFFFFFFFFFFFFFFF }; }",
        &options(),
    );
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let h = header(&out);
    assert!(h.contains("public enum class Big : uint64_t {"));
    let body: Vec<_> = block(&h, "public enum class Big").iter().map(|l| l.trim()).collect();
    assert_eq!(body, vec!["small = 1,", "max = 18446744073709551615ULL"]);
}

#[test]
fn parameter_named_like_wrapped_object_is_renamed() {
    let out = generate(
        "namespace N { class Widget { void *h; public: void attach(const Widget &native); }; }",
        &options(),
    );
    assert!(header(&out).contains("void attach(M::Widget^ native_);"));
    let cpp = definition(&out);
    assert!(cpp.contains("void M::Widget::attach(M::Widget^ native_) {"));
    assert!(cpp.contains("const N::Widget& arg0 = *native_->native;"));
    assert!(cpp.contains("native->attach(arg0);"));
}

#[test]
fn adapter_steps_aside_for_header_type_of_same_name() {
    let out = generate(
        "namespace N {\n\
         class Listener { public: virtual void ping() = 0; };\n\
         class ListenerAdapter { void *h; public: Listener *current(); };\n\
         }",
        &options(),
    );
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let h = header(&out);
    assert_eq!(h.matches("ref class ListenerAdapter;").count(), 1);
    assert_eq!(h.matches("ref class ListenerAdapter_;").count(), 1);
    assert_eq!(h.matches("public ref class ListenerAdapter {").count(), 1);
    assert!(h.contains("public ref class ListenerAdapter_ : public M::Listener {"));

    let cpp = definition(&out);
    assert!(cpp.contains("gcnew M::ListenerAdapter_(new std::shared_ptr<N::Listener>(unmanagedResult"));
    assert!(cpp.contains("void M::ListenerAdapter_::ping() {"));
}

#[test]
fn overload_does_not_hide_inherited_requirement() {
    let out = generate(
        "namespace N {\n\
         class Named { public: virtual std::string name() const = 0; };\n\
         class Camera : public Named { void *h; public: int name(int i) const; };\n\
         }",
        &options(),
    );
    let h = header(&out);
    let camera = block(&h, "public ref class Camera : public M::Named {");
    assert!(camera.iter().any(|l| l.trim() == "int name(int i);"));
    assert!(camera.iter().any(|l| l.trim() == "virtual System::String^ name();"));
    let cpp = definition(&out);
    assert!(cpp.contains("int M::Camera::name(int i) {"));
    assert!(cpp.contains("System::String^ M::Camera::name() {"));
}

#[test]
fn protocol_returned_by_reference_is_adapted() {
    let out = generate(
        "namespace N {\n\
         class Listener { public: virtual void ping() = 0; };\n\
         class Hub { void *h; public: Listener &listener(); };\n\
         }",
        &options(),
    );
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let cpp = definition(&out);
    assert!(cpp.contains("M::Listener^ M::Hub::listener() {"));
    assert!(cpp.contains("N::Listener& unmanagedResult = native->listener();"));
    assert!(cpp.contains(
        "return gcnew M::ListenerAdapter(new std::shared_ptr<N::Listener>(const_cast<N::Listener*>(&unmanagedResult), [](N::Listener*) {}));"
    ));
}

#[test]
fn diagnostics_follow_header_order() {
    let out = generate(
        "namespace N {\n\
         class Delegate { public: virtual void ping() = 0; };\n\
         class Good : public Delegate { void *h; public: void ping() override; };\n\
         class Bad : public Good { void *h; };\n\
         union U { int a; float b; };\n\
         class Late { void *h; public: Gadget frob(); };\n\
         }",
        &options(),
    );
    let subjects: Vec<_> = out.diagnostics.iter().map(|d| d.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Bad", "U", "Late::frob"]);
}

#[test]
fn loads_headers_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Api.hpp");
    std::fs::write(&path, WIDGET_HEADER).unwrap();

    let out = execute(&path, &options()).unwrap();
    assert_eq!(out.report.header, "Api.hpp");
    assert!(header(&out).contains("#include \"Api.hpp\""));
}
