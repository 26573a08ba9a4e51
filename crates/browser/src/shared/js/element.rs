pub const CHECK_ELEMENT_STATE: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    if (!el) return { exists: false, visible: false };

    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = rect.width > 0 && rect.height > 0 &&
                    style.visibility !== 'hidden' && style.display !== 'none';

    return { exists: true, visible };
}
"#;

pub const TEXT_CONTENT: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    return el ? (el.textContent || '') : null;
}
"#;

pub const SELECT_OPTION: &str = r#"
(selector, value) => {
    const el = document.querySelector(selector);
    if (!el) return { success: false, error: 'Element not found' };
    el.value = value;
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return { success: true };
}
"#;
