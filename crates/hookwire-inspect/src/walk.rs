//! Walking a type's declaration and its bases.

use hookwire_marker::{
    validate_members, Declaration, DeclarationError, Hooked, Member,
    TypeDescriptor,
};

/// Declares `T`, expands every base, and returns all members (every role)
/// in the fixed order: inherited first, then `T`'s own.
///
/// This is the only place `Hooked::declare` gets called.
pub(crate) fn walk<T: Hooked>() -> Result<Vec<Member<T>>, DeclarationError> {
    let owner = TypeDescriptor::of::<T>();
    let mut decl = Declaration::<T>::new();
    T::declare(&mut decl);

    let mut path = vec![owner];
    let mut expanded = Vec::new();
    let mut members = Vec::new();
    flatten(decl, &mut path, &mut expanded, &mut members)?;
    validate_members(owner, &members)?;

    tracing::trace!(ty = %owner, members = members.len(), "walked declaration");
    Ok(members)
}

/// Depth-first over the bases of `decl`, bases before own members.
///
/// `path` holds the types from the root down to `decl`'s owner; meeting
/// one of them again is a cycle. `expanded` holds every base seen so far
/// anywhere in the hierarchy; meeting one of those again is a duplicate.
fn flatten<T: 'static>(
    decl: Declaration<T>,
    path: &mut Vec<TypeDescriptor>,
    expanded: &mut Vec<TypeDescriptor>,
    out: &mut Vec<Member<T>>,
) -> Result<(), DeclarationError> {
    let owner = decl.owner();
    let (ancestors, own) = decl.into_parts();

    for ancestor in ancestors {
        let base = ancestor.base();
        if path.contains(&base) {
            return Err(DeclarationError::InheritanceCycle { ty: owner, base });
        }
        if expanded.contains(&base) {
            return Err(DeclarationError::DuplicateBase { ty: owner, base });
        }
        expanded.push(base);
        path.push(base);
        flatten(ancestor.expand(), path, expanded, out)?;
        path.pop();
    }

    out.extend(own);
    Ok(())
}
