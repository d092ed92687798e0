mod support;
mod unmount_unit;
