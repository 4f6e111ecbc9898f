pub mod books;

use shelf_kernel::ModuleRegistry;

use self::books::routes::BooksState;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, books: BooksState) {
    registry.register_custom(books::create_module(books));
}
